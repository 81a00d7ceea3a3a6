//! Axum route handlers for the Resume API.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::resumes::ingest::{IngestedResume, ResumeIngest};
use crate::state::AppState;

/// POST /api/v1/resumes
///
/// Multipart upload with a single `file` field (.pdf, .txt or .md).
/// Word documents (.docx, .doc) are not supported and get a 400 like any
/// other unknown suffix; convert them to PDF or text first.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IngestedResume>), AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("file field has no filename".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?;
        upload = Some((filename, bytes));
        break;
    }
    let (filename, bytes) =
        upload.ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;

    let llm = state.llm_client();
    let ingest = ResumeIngest {
        store: state.store.as_ref(),
        resumes_index: state.resumes_index.as_ref(),
        embedder: &llm,
    };
    let resume = ingest.ingest(&filename, &bytes).await?;

    Ok((StatusCode::CREATED, Json(resume)))
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    Ok(Json(state.store.list_resumes().await?))
}

/// DELETE /api/v1/resumes
///
/// Removes every resume, its chunks, and the ranking run log.
pub async fn handle_wipe_resumes(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.store.wipe_resumes().await?;
    state.resumes_index.clear().await?;
    info!("Resume store and index wiped");
    Ok(StatusCode::NO_CONTENT)
}
