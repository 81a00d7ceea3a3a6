//! Append-only run log records. Never mutated after insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One ingestion run (`run_search`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRunRecord {
    pub run_id: Uuid,
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub added_count: i32,
    /// Per-source added counts rendered as JSON, e.g. `{"remotive":3}`.
    pub source_summary: String,
}

/// One ranking run (`rank`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MatchRunRecord {
    pub run_id: Uuid,
    pub resume_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub top_k: i32,
    /// `"llm"` when rerank was requested, otherwise `"no-llm"`.
    pub notes: String,
}
