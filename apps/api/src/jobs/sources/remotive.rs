use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::{board_job_id, fetch_json, str_field, JobSource};
use crate::models::job::{parse_timestamp, JobPosting};

const REMOTIVE_URL: &str = "https://remotive.com/api/remote-jobs";

/// Remotive's public remote-jobs API. The query is passed through as the
/// server-side `search` parameter.
pub struct RemotiveSource {
    http: reqwest::Client,
    category: Option<String>,
}

impl RemotiveSource {
    pub fn new(http: reqwest::Client, category: Option<String>) -> Self {
        Self { http, category }
    }
}

#[async_trait]
impl JobSource for RemotiveSource {
    fn name(&self) -> &'static str {
        "remotive"
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<JobPosting> {
        let mut params = vec![("search", query)];
        if let Some(category) = &self.category {
            params.push(("category", category.as_str()));
        }

        match fetch_json(&self.http, REMOTIVE_URL, &params).await {
            Ok(body) => {
                let jobs = parse_response(&body, limit);
                info!("Remotive returned {} jobs for '{query}'", jobs.len());
                jobs
            }
            Err(e) => {
                warn!("Remotive fetch failed: {e}");
                Vec::new()
            }
        }
    }
}

fn parse_response(body: &Value, limit: usize) -> Vec<JobPosting> {
    let Some(entries) = body.get("jobs").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .take(limit)
        .map(|entry| {
            let title = str_field(entry, "title");
            let company = str_field(entry, "company_name");
            let location = entry
                .get("candidate_required_location")
                .and_then(Value::as_str);
            let url = str_field(entry, "url");
            JobPosting {
                job_id: board_job_id(entry.get("id"), title, company, location, url),
                title: title.to_string(),
                company: company.to_string(),
                location: location.map(String::from),
                url: url.to_string(),
                source: "remotive".to_string(),
                posted_at: parse_timestamp(str_field(entry, "publication_date")),
                description: str_field(entry, "description").to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_response_maps_fields_and_limits() {
        let body = json!({
            "job-count": 3,
            "jobs": [
                {
                    "id": 1901,
                    "url": "https://remotive.com/remote-jobs/software-dev/rust-1901",
                    "title": "Rust Engineer",
                    "company_name": "Ferrous",
                    "candidate_required_location": "Europe",
                    "publication_date": "2024-05-01T09:30:00",
                    "description": "<p>Write Rust</p>"
                },
                {"id": 1902, "title": "Second", "url": "https://remotive.com/2"},
                {"id": 1903, "title": "Third", "url": "https://remotive.com/3"}
            ]
        });

        let jobs = parse_response(&body, 2);
        assert_eq!(jobs.len(), 2);

        let first = &jobs[0];
        assert_eq!(first.job_id, "1901");
        assert_eq!(first.company, "Ferrous");
        assert_eq!(first.location.as_deref(), Some("Europe"));
        assert_eq!(first.source, "remotive");
        assert_eq!(first.description, "<p>Write Rust</p>");
        assert!(first.posted_at.is_some());

        assert_eq!(jobs[1].company, "");
        assert!(jobs[1].location.is_none());
        assert!(jobs[1].posted_at.is_none());
    }

    #[test]
    fn test_parse_response_without_jobs_key() {
        assert!(parse_response(&json!({"error": "rate limited"}), 10).is_empty());
    }
}
