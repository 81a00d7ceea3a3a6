mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod matching;
mod models;
mod resumes;
mod routes;
mod state;
mod storage;
mod text;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::settings::LlmSettingsCell;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::Backends;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobMatch API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize storage: PostgreSQL, or in-memory when DATABASE_URL is unset
    let backends = Backends::connect(config.database_url.as_deref()).await?;

    // Runtime LLM settings start from the environment defaults
    let llm_settings = Arc::new(LlmSettingsCell::new(config.llm.clone()));
    let active = llm_settings.active();
    info!(
        "LLM provider: {:?} (chat model: {}, embed model: {})",
        active.provider, active.model, active.embed_model
    );
    info!("Job sources: {}", config.sources.job_sources.join(", "));

    // Build app state
    let state = AppState {
        store: backends.store,
        jobs_index: backends.jobs_index,
        resumes_index: backends.resumes_index,
        llm_settings,
        http: reqwest::Client::new(),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS origins once the UI host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
