//! Axum route handlers for the Jobs API.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::jobs::scout::JobScout;
use crate::jobs::sources::sources_from_config;
use crate::models::job::JobRow;
use crate::state::AppState;

fn default_limit_per_source() -> usize {
    50
}

fn default_list_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_limit_per_source")]
    pub limit_per_source: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub added: BTreeMap<String, usize>,
    pub total_added: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    pub source: Option<String>,
}

/// POST /api/v1/jobs/search
///
/// Fetches postings from every configured source, stores and indexes the new ones.
pub async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::Validation("query cannot be empty".to_string()));
    }

    let sources = sources_from_config(&state.config.sources, state.http.clone());
    let llm = state.llm_client();
    let scout = JobScout {
        sources: &sources,
        store: state.store.as_ref(),
        jobs_index: state.jobs_index.as_ref(),
        embedder: &llm,
    };
    let added = scout
        .run_search(request.query.trim(), request.limit_per_source)
        .await?;

    Ok(Json(SearchResponse {
        total_added: added.values().sum(),
        added,
    }))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    if params.limit < 0 {
        return Err(AppError::Validation("limit cannot be negative".to_string()));
    }
    let jobs = state
        .store
        .list_jobs(params.limit, params.source.as_deref())
        .await?;
    Ok(Json(jobs))
}

/// GET /api/v1/jobs/:job_id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRow>, AppError> {
    let job = state
        .store
        .get_job(&job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    Ok(Json(job))
}

/// DELETE /api/v1/jobs
///
/// Removes every stored posting, the job index, and the ingestion run log.
pub async fn handle_wipe_jobs(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.store.wipe_jobs().await?;
    state.jobs_index.clear().await?;
    info!("Job store and index wiped");
    Ok(StatusCode::NO_CONTENT)
}
