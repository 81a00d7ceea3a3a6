pub mod health;
pub mod runs;
pub mod settings;

use axum::{
    routing::{get, post},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::matching::handlers as matching;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs API
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).delete(jobs::handle_wipe_jobs),
        )
        .route("/api/v1/jobs/search", post(jobs::handle_search))
        .route("/api/v1/jobs/:job_id", get(jobs::handle_get_job))
        // Resume API
        .route(
            "/api/v1/resumes",
            post(resumes::handle_upload)
                .get(resumes::handle_list_resumes)
                .delete(resumes::handle_wipe_resumes),
        )
        // Match API
        .route("/api/v1/match", post(matching::handle_match))
        // Run logs
        .route("/api/v1/runs/jobs", get(runs::handle_job_runs))
        .route("/api/v1/runs/matches", get(runs::handle_match_runs))
        // Settings
        .route(
            "/api/v1/settings/llm",
            get(settings::handle_get_llm_settings)
                .put(settings::handle_put_llm_settings)
                .delete(settings::handle_clear_llm_settings),
        )
        .with_state(state)
}
