use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A scraped job posting. Immutable once created by a source, apart from
/// description cleaning before storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobPosting {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub url: String,
    pub source: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub description: String,
}

impl JobPosting {
    /// Text embedded into the job index: headline line followed by the description.
    pub fn document_text(&self) -> String {
        format!(
            "{} at {} {}\n{}",
            self.title,
            self.company,
            self.location.as_deref().unwrap_or(""),
            self.description
        )
    }
}

/// A stored posting plus the time it was admitted to the corpus.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub posting: JobPosting,
    pub added_at: DateTime<Utc>,
}

/// Parses the timestamp formats job boards hand back (RFC 3339, or a naive
/// ISO date-time assumed to be UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_text_without_location() {
        let posting = JobPosting {
            job_id: "1".to_string(),
            title: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            location: None,
            url: "https://example.com/1".to_string(),
            source: "dummy".to_string(),
            posted_at: None,
            description: "Build services".to_string(),
        };
        assert_eq!(posting.document_text(), "Backend Engineer at Acme \nBuild services");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-05-01T12:00:00-04:00").is_some());
        assert!(parse_timestamp("2024-05-01T12:00:00").is_some());
        assert!(parse_timestamp("2024-05-01T12:00:00.123456").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
