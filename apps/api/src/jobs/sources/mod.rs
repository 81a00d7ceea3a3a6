//! Job boards the ingestion run pulls postings from.
//!
//! Every source speaks the same `JobSource` interface. A source that cannot
//! be reached logs the failure and contributes nothing to the run.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::jobs::dedupe::stable_id;
use crate::models::job::JobPosting;

pub mod dummy;
pub mod greenhouse;
pub mod lever;
pub mod remotive;

pub use dummy::DummySource;
pub use greenhouse::GreenhouseSource;
pub use lever::LeverSource;
pub use remotive::RemotiveSource;

/// Per-request timeout for board APIs.
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
pub trait JobSource: Send + Sync {
    /// Identifier recorded as `JobPosting::source` and used as the run summary key.
    fn name(&self) -> &'static str;

    /// Returns at most `limit` postings for `query`. Never fails; network and
    /// decode errors are logged and yield an empty list.
    async fn search(&self, query: &str, limit: usize) -> Vec<JobPosting>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Dummy,
    Remotive,
    Greenhouse,
    Lever,
}

#[derive(Debug, Error)]
#[error("unknown job source '{0}'")]
pub struct UnknownSource(pub String);

impl FromStr for SourceKind {
    type Err = UnknownSource;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dummy" => Ok(SourceKind::Dummy),
            "remotive" => Ok(SourceKind::Remotive),
            "greenhouse" => Ok(SourceKind::Greenhouse),
            "lever" => Ok(SourceKind::Lever),
            _ => Err(UnknownSource(name.to_string())),
        }
    }
}

/// Which sources to query and the boards each one covers.
#[derive(Debug, Clone, Default)]
pub struct SourcesConfig {
    pub job_sources: Vec<String>,
    pub greenhouse_boards: Vec<String>,
    pub lever_companies: Vec<String>,
    pub remotive_category: Option<String>,
}

/// Instantiates the configured sources in order. Unknown names are skipped.
pub fn sources_from_config(config: &SourcesConfig, http: reqwest::Client) -> Vec<Arc<dyn JobSource>> {
    config
        .job_sources
        .iter()
        .filter_map(|name| match name.parse::<SourceKind>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                warn!("Ignoring {e}");
                None
            }
        })
        .map(|kind| -> Arc<dyn JobSource> {
            match kind {
                SourceKind::Dummy => Arc::new(DummySource),
                SourceKind::Remotive => Arc::new(RemotiveSource::new(
                    http.clone(),
                    config.remotive_category.clone(),
                )),
                SourceKind::Greenhouse => Arc::new(GreenhouseSource::new(
                    http.clone(),
                    config.greenhouse_boards.clone(),
                )),
                SourceKind::Lever => Arc::new(LeverSource::new(
                    http.clone(),
                    config.lever_companies.clone(),
                )),
            }
        })
        .collect()
}

/// Case-insensitive substring match against title or description.
/// An empty query matches everything.
pub fn matches_query(query: &str, title: &str, description: &str) -> bool {
    let needle = query.trim().to_lowercase();
    needle.is_empty()
        || title.to_lowercase().contains(&needle)
        || description.to_lowercase().contains(&needle)
}

/// Board id as a string, or a `stable_id` when the board supplied none.
pub(crate) fn board_job_id(
    raw_id: Option<&Value>,
    title: &str,
    company: &str,
    location: Option<&str>,
    url: &str,
) -> String {
    match raw_id {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => stable_id(title, company, location, url),
    }
}

/// String field of a JSON object, empty when missing or not a string.
pub(crate) fn str_field<'a>(entry: &'a Value, key: &str) -> &'a str {
    entry.get(key).and_then(Value::as_str).unwrap_or_default()
}

pub(crate) async fn fetch_json(
    http: &reqwest::Client,
    url: &str,
    params: &[(&str, &str)],
) -> Result<Value, reqwest::Error> {
    http.get(url)
        .query(params)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json::<Value>()
        .await
}
