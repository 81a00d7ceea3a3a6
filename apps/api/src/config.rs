use std::str::FromStr;

use anyhow::{Context, Result};

use crate::jobs::sources::SourcesConfig;
use crate::llm_client::settings::{LlmDefaults, Provider};
use crate::matching::scoring::HybridWeights;
use crate::matching::{EmptyResumePolicy, MatchConfig};

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unset means in-memory storage.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub llm: LlmDefaults,
    pub sources: SourcesConfig,
    pub matching: MatchConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let llm_defaults = LlmDefaults::default();
        let match_defaults = MatchConfig::default();

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm: LlmDefaults {
                provider: Provider::parse(&env_or("LLM_PROVIDER", "ollama".to_string())?),
                openai_api_key: std::env::var("OPENAI_API_KEY")
                    .ok()
                    .filter(|k| !k.is_empty()),
                ollama_base_url: env_or("OLLAMA_BASE_URL", llm_defaults.ollama_base_url)?,
                ollama_model: env_or("OLLAMA_MODEL", llm_defaults.ollama_model)?,
                ollama_embed_model: env_or("OLLAMA_EMBED_MODEL", llm_defaults.ollama_embed_model)?,
                openai_base_url: env_or("OPENAI_BASE_URL", llm_defaults.openai_base_url)?,
                openai_model: env_or("OPENAI_MODEL", llm_defaults.openai_model)?,
                openai_embed_model: env_or("OPENAI_EMBED_MODEL", llm_defaults.openai_embed_model)?,
            },
            sources: SourcesConfig {
                job_sources: env_list("JOB_SOURCES").unwrap_or_else(|| {
                    vec!["remotive".to_string(), "dummy".to_string()]
                }),
                greenhouse_boards: env_list("GREENHOUSE_BOARDS").unwrap_or_default(),
                lever_companies: env_list("LEVER_COMPANIES").unwrap_or_default(),
                remotive_category: std::env::var("REMOTIVE_CATEGORY")
                    .ok()
                    .filter(|c| !c.trim().is_empty()),
            },
            matching: MatchConfig {
                max_embed_chars: env_or("MATCH_MAX_EMBED_CHARS", match_defaults.max_embed_chars)?,
                max_llm_resume_chars: env_or(
                    "MATCH_MAX_LLM_RESUME_CHARS",
                    match_defaults.max_llm_resume_chars,
                )?,
                max_llm_job_chars: env_or("MATCH_MAX_LLM_JOB_CHARS", match_defaults.max_llm_job_chars)?,
                resume_chunks: env_or("MATCH_RESUME_CHUNKS", match_defaults.resume_chunks)?,
                weights: HybridWeights {
                    semantic: env_or("MATCH_SEMANTIC_WEIGHT", match_defaults.weights.semantic)?,
                    keyword: env_or("MATCH_KEYWORD_WEIGHT", match_defaults.weights.keyword)?,
                },
                empty_resume: if env_or("MATCH_SKIP_EMPTY_RESUME", false)? {
                    EmptyResumePolicy::Skip
                } else {
                    EmptyResumePolicy::Embed
                },
            },
        })
    }
}

/// Parses `key` if set, otherwise returns `default`.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}")),
        _ => Ok(default),
    }
}

/// Comma-separated list; `None` when the variable is unset.
fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|raw| split_list(&raw))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
