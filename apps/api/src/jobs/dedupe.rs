//! Posting identity and within-run duplicate detection.
//!
//! Cross-run duplicates are caught by the job store's unique constraint on
//! `url`; the seen-set here only lives for one ingestion run.

use std::collections::HashSet;

use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::models::job::JobPosting;

/// Deterministic identity for a posting whose source supplies no id.
///
/// Title, company and location are lower-cased and trimmed; the URL loses its
/// query string and fragment. The four fields are joined with `|` and hashed
/// with SHA-256 into a 64-char hex string.
pub fn stable_id(title: &str, company: &str, location: Option<&str>, url: &str) -> String {
    let key = format!(
        "{}|{}|{}|{}",
        title.trim().to_lowercase(),
        company.trim().to_lowercase(),
        location.unwrap_or("").trim().to_lowercase(),
        normalize_url(url)
    );
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Strips the query string and fragment from a URL.
///
/// Unparseable input (relative paths, empty strings) is cut at the first
/// `?` or `#` instead.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Returns `true` if the posting's normalized URL was already seen in this
/// run. First sightings are recorded and return `false`.
pub fn is_duplicate(seen: &mut HashSet<String>, posting: &JobPosting) -> bool {
    !seen.insert(normalize_url(&posting.url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(url: &str) -> JobPosting {
        JobPosting {
            job_id: "1".to_string(),
            title: "t".to_string(),
            company: "c".to_string(),
            location: None,
            url: url.to_string(),
            source: "s".to_string(),
            posted_at: None,
            description: "d".to_string(),
        }
    }

    #[test]
    fn test_stable_id_deterministic() {
        let a = stable_id("Title", "Company", Some("Remote"), "https://example.com/a");
        let b = stable_id("Title", "Company", Some("Remote"), "https://example.com/a");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_stable_id_normalizes_case_and_whitespace() {
        let a = stable_id("  Rust Engineer ", "ACME", Some("Remote "), "https://example.com/a");
        let b = stable_id("rust engineer", "acme", Some("remote"), "https://example.com/a");
        assert_eq!(a, b);
    }

    #[test]
    fn test_stable_id_ignores_query_and_fragment() {
        let a = stable_id("t", "c", None, "https://example.com/role?utm_source=x#apply");
        let b = stable_id("t", "c", None, "https://example.com/role");
        assert_eq!(a, b);
    }

    #[test]
    fn test_stable_id_missing_location_equals_empty() {
        assert_eq!(
            stable_id("t", "c", None, "https://example.com/a"),
            stable_id("t", "c", Some(""), "https://example.com/a")
        );
    }

    #[test]
    fn test_stable_id_differs_on_company() {
        assert_ne!(
            stable_id("t", "acme", None, "https://example.com/a"),
            stable_id("t", "globex", None, "https://example.com/a")
        );
    }

    #[test]
    fn test_normalize_url_removes_query() {
        assert_eq!(
            normalize_url("https://example.com/role?utm=123"),
            "https://example.com/role"
        );
    }

    #[test]
    fn test_normalize_url_unparseable_falls_back() {
        assert_eq!(normalize_url("/jobs/42?ref=board#top"), "/jobs/42");
        assert_eq!(normalize_url(""), "");
    }

    #[test]
    fn test_is_duplicate_first_sighting_then_repeat() {
        let mut seen = HashSet::new();
        let job = posting("https://example.com/a?x=1");
        assert!(!is_duplicate(&mut seen, &job));
        assert!(is_duplicate(&mut seen, &job));
        assert!(is_duplicate(&mut seen, &posting("https://example.com/a?x=2")));
        assert!(!is_duplicate(&mut seen, &posting("https://example.com/b")));
    }
}
