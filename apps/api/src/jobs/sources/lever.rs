use async_trait::async_trait;
use chrono::DateTime;
use serde_json::Value;
use tracing::{info, warn};

use super::{board_job_id, fetch_json, matches_query, str_field, JobSource};
use crate::models::job::JobPosting;

/// Lever postings API, one request per configured company handle.
pub struct LeverSource {
    http: reqwest::Client,
    companies: Vec<String>,
}

impl LeverSource {
    pub fn new(http: reqwest::Client, companies: Vec<String>) -> Self {
        Self { http, companies }
    }
}

#[async_trait]
impl JobSource for LeverSource {
    fn name(&self) -> &'static str {
        "lever"
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<JobPosting> {
        let mut jobs = Vec::new();
        for company in &self.companies {
            if jobs.len() >= limit {
                break;
            }
            let url = format!("https://api.lever.co/v0/postings/{company}");
            let body = match fetch_json(&self.http, &url, &[("mode", "json")]).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Lever fetch failed for '{company}': {e}");
                    continue;
                }
            };
            let remaining = limit - jobs.len();
            let found = parse_postings(&body, company, query, remaining);
            info!("Lever company '{company}' matched {} jobs", found.len());
            jobs.extend(found);
        }
        jobs
    }
}

fn parse_postings(body: &Value, company: &str, query: &str, limit: usize) -> Vec<JobPosting> {
    let Some(entries) = body.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let title = str_field(entry, "text");
            let description = str_field(entry, "description");
            if !matches_query(query, title, description) {
                return None;
            }
            let location = entry
                .get("categories")
                .and_then(|c| c.get("location"))
                .and_then(Value::as_str);
            let url = str_field(entry, "hostedUrl");
            Some(JobPosting {
                job_id: board_job_id(entry.get("id"), title, company, location, url),
                title: title.to_string(),
                company: company.to_string(),
                location: location.map(String::from),
                url: url.to_string(),
                source: "lever".to_string(),
                // createdAt is epoch milliseconds
                posted_at: entry
                    .get("createdAt")
                    .and_then(Value::as_i64)
                    .and_then(DateTime::from_timestamp_millis),
                description: description.to_string(),
            })
        })
        .take(limit)
        .collect()
}
