use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::run::{JobRunRecord, MatchRunRecord};
use crate::state::AppState;

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn validate(params: &RunsQuery) -> Result<(), AppError> {
    if params.limit < 0 {
        return Err(AppError::Validation("limit cannot be negative".to_string()));
    }
    Ok(())
}

/// GET /api/v1/runs/jobs
pub async fn handle_job_runs(
    State(state): State<AppState>,
    Query(params): Query<RunsQuery>,
) -> Result<Json<Vec<JobRunRecord>>, AppError> {
    validate(&params)?;
    Ok(Json(state.store.list_job_runs(params.limit).await?))
}

/// GET /api/v1/runs/matches
pub async fn handle_match_runs(
    State(state): State<AppState>,
    Query(params): Query<RunsQuery>,
) -> Result<Json<Vec<MatchRunRecord>>, AppError> {
    validate(&params)?;
    Ok(Json(state.store.list_match_runs(params.limit).await?))
}
