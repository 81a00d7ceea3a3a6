use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::settings::LlmSettingsCell;
use crate::llm_client::LlmClient;
use crate::storage::{JobStore, VectorIndex};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub jobs_index: Arc<dyn VectorIndex>,
    pub resumes_index: Arc<dyn VectorIndex>,
    /// Runtime provider overrides. Read once per request via `llm_client()`.
    pub llm_settings: Arc<LlmSettingsCell>,
    /// Connection-pooled HTTP client shared by provider and job source calls.
    pub http: reqwest::Client,
    pub config: Config,
}

impl AppState {
    /// Builds a provider client from the settings active right now.
    pub fn llm_client(&self) -> LlmClient {
        LlmClient::new(self.http.clone(), self.llm_settings.active())
    }
}
