// Resume → job matching: retrieval, hybrid scoring, LLM rerank with
// reconciliation, and the orchestrating pipeline.
// All provider calls go through the llm_client traits.

pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod rerank;
pub mod retrieval;
pub mod scoring;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::matching::scoring::HybridWeights;

/// What to do when a resume has no stored chunks (empty query text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyResumePolicy {
    /// Embed the empty string anyway and let retrieval decide.
    #[default]
    Embed,
    /// Return an empty ranking without calling the embedding provider.
    Skip,
}

/// Tunables for one ranking invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Character budget for the text sent to the embedding model.
    pub max_embed_chars: usize,
    /// Character budget for the resume inside the rerank prompt.
    pub max_llm_resume_chars: usize,
    /// Character budget for each job description inside the rerank prompt.
    pub max_llm_job_chars: usize,
    /// Resume chunks concatenated into the query text.
    pub resume_chunks: usize,
    pub weights: HybridWeights,
    pub empty_resume: EmptyResumePolicy,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_embed_chars: 6000,
            max_llm_resume_chars: 6000,
            max_llm_job_chars: 4000,
            resume_chunks: 3,
            weights: HybridWeights::default(),
            empty_resume: EmptyResumePolicy::Embed,
        }
    }
}

/// Per-job assessment, from the re-ranker or synthesized from the hybrid score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub job_id: String,
    pub score_0_to_100: u32,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub short_reason: String,
}

/// Reason attached to results synthesized for jobs the model skipped.
pub const FILLED_FROM_HYBRID_REASON: &str = "Filled from hybrid score (LLM missing)";

impl MatchResult {
    /// Stand-in for a job the model never scored.
    pub fn filled_from_hybrid(job_id: &str, hybrid_score: u32) -> Self {
        Self {
            job_id: job_id.to_string(),
            score_0_to_100: hybrid_score.min(100),
            strengths: Vec::new(),
            gaps: Vec::new(),
            short_reason: FILLED_FROM_HYBRID_REASON.to_string(),
        }
    }

    /// Lenient decode of one model-produced item. The score may arrive as an
    /// integer, float or numeric string; it is rounded and clamped to 0–100.
    /// Returns `None` when the score is absent or not numeric.
    pub fn from_value(job_id: &str, item: &Value) -> Option<Self> {
        let score = match item.get("score_0_to_100")? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if !score.is_finite() {
            return None;
        }

        let strings = |key: &str| -> Vec<String> {
            item.get(key)
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default()
        };

        Some(Self {
            job_id: job_id.to_string(),
            score_0_to_100: score.round().clamp(0.0, 100.0) as u32,
            strengths: strings("strengths"),
            gaps: strings("gaps"),
            short_reason: item
                .get("short_reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// A retrieved job with its scores. Lives for one ranking call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub url: String,
    pub source: String,
    pub posted_at: Option<String>,
    pub distance: f64,
    pub description: String,
    pub distance_score: u32,
    pub keyword_score: u32,
    pub hybrid_score: u32,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_result: Option<MatchResult>,
}

impl Candidate {
    /// Sort key: the rerank score when present, else the hybrid score.
    pub fn rank_score(&self) -> u32 {
        self.match_result
            .as_ref()
            .map(|m| m.score_0_to_100)
            .unwrap_or(self.hybrid_score)
    }
}
