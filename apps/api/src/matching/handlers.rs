//! Axum route handlers for the Match API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::pipeline::MatchPipeline;
use crate::matching::Candidate;
use crate::state::AppState;

fn default_top_k() -> usize {
    25
}

fn default_use_llm_rerank() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub resume_id: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_use_llm_rerank")]
    pub use_llm_rerank: bool,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub resume_id: String,
    pub results: Vec<Candidate>,
}

/// POST /api/v1/match
///
/// Ranks indexed jobs against a stored resume. Results are sorted best first.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    if request.resume_id.trim().is_empty() {
        return Err(AppError::Validation("resume_id cannot be empty".to_string()));
    }
    if request.top_k == 0 {
        return Err(AppError::Validation("top_k must be at least 1".to_string()));
    }

    let llm = state.llm_client();
    let pipeline = MatchPipeline {
        store: state.store.as_ref(),
        jobs_index: state.jobs_index.as_ref(),
        resumes_index: state.resumes_index.as_ref(),
        embedder: &llm,
        chat: &llm,
        config: &state.config.matching,
    };
    let results = pipeline
        .rank(&request.resume_id, request.top_k, request.use_llm_rerank)
        .await?;

    Ok(Json(MatchResponse {
        resume_id: request.resume_id,
        results,
    }))
}
