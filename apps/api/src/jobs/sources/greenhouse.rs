use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::{board_job_id, fetch_json, matches_query, str_field, JobSource};
use crate::models::job::{parse_timestamp, JobPosting};
use crate::text::strip_html;

/// Greenhouse job boards API, one request per configured board token.
/// Postings are filtered client-side against the query.
pub struct GreenhouseSource {
    http: reqwest::Client,
    boards: Vec<String>,
}

impl GreenhouseSource {
    pub fn new(http: reqwest::Client, boards: Vec<String>) -> Self {
        Self { http, boards }
    }
}

#[async_trait]
impl JobSource for GreenhouseSource {
    fn name(&self) -> &'static str {
        "greenhouse"
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<JobPosting> {
        let mut jobs = Vec::new();
        for board in &self.boards {
            if jobs.len() >= limit {
                break;
            }
            let url = format!("https://boards-api.greenhouse.io/v1/boards/{board}/jobs");
            let body = match fetch_json(&self.http, &url, &[("content", "true")]).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Greenhouse fetch failed for board '{board}': {e}");
                    continue;
                }
            };
            let remaining = limit - jobs.len();
            let found = parse_board(&body, board, query, remaining);
            info!("Greenhouse board '{board}' matched {} jobs", found.len());
            jobs.extend(found);
        }
        jobs
    }
}

fn parse_board(body: &Value, board: &str, query: &str, limit: usize) -> Vec<JobPosting> {
    let Some(entries) = body.get("jobs").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let title = str_field(entry, "title");
            // Greenhouse entity-escapes its HTML; decode once here so the
            // run's tag stripping sees real markup.
            let content = strip_html(str_field(entry, "content"));
            if !matches_query(query, title, &content) {
                return None;
            }
            let location = entry
                .get("location")
                .and_then(|l| l.get("name"))
                .and_then(Value::as_str);
            let url = str_field(entry, "absolute_url");
            Some(JobPosting {
                job_id: board_job_id(entry.get("id"), title, board, location, url),
                title: title.to_string(),
                company: board.to_string(),
                location: location.map(String::from),
                url: url.to_string(),
                source: "greenhouse".to_string(),
                posted_at: parse_timestamp(str_field(entry, "updated_at")),
                description: content,
            })
        })
        .take(limit)
        .collect()
}
