//! Runtime LLM settings: inspect, override, and reset to environment defaults.

use axum::{extract::State, http::StatusCode, Json};

use crate::errors::AppError;
use crate::llm_client::settings::LlmOverrides;
use crate::llm_client::LlmSettings;
use crate::state::AppState;

/// GET /api/v1/settings/llm
///
/// The settings the next request will use. The API key is never echoed.
pub async fn handle_get_llm_settings(State(state): State<AppState>) -> Json<LlmSettings> {
    Json(state.llm_settings.active())
}

/// PUT /api/v1/settings/llm
pub async fn handle_put_llm_settings(
    State(state): State<AppState>,
    Json(overrides): Json<LlmOverrides>,
) -> Result<Json<LlmSettings>, AppError> {
    if let Some(provider) = overrides.provider.as_deref() {
        if provider.trim().is_empty() {
            return Err(AppError::Validation("provider cannot be empty".to_string()));
        }
    }
    state.llm_settings.set(overrides);
    Ok(Json(state.llm_settings.active()))
}

/// DELETE /api/v1/settings/llm
pub async fn handle_clear_llm_settings(State(state): State<AppState>) -> StatusCode {
    state.llm_settings.clear();
    StatusCode::NO_CONTENT
}
