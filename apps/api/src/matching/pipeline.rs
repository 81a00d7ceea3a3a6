//! The ranking pipeline: query text → retrieval → hybrid scores → optional
//! rerank → sort → run log.
//!
//! Every collaborator is borrowed for the duration of one `rank` call; the
//! pipeline owns its candidates and hands them to the caller on return.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::{ChatProvider, EmbeddingProvider};
use crate::matching::rerank::rerank;
use crate::matching::retrieval::{resume_query_text, retrieve};
use crate::matching::scoring::{distance_to_score, hybrid_score, keyword_overlap, HybridWeights};
use crate::matching::{Candidate, EmptyResumePolicy, MatchConfig, MatchResult};
use crate::models::run::MatchRunRecord;
use crate::storage::{JobStore, VectorHit, VectorIndex};
use crate::text::strip_html;

pub struct MatchPipeline<'a> {
    pub store: &'a dyn JobStore,
    pub jobs_index: &'a dyn VectorIndex,
    pub resumes_index: &'a dyn VectorIndex,
    pub embedder: &'a dyn EmbeddingProvider,
    pub chat: &'a dyn ChatProvider,
    pub config: &'a MatchConfig,
}

impl MatchPipeline<'_> {
    /// Ranks indexed jobs against a stored resume, best first.
    ///
    /// Only embedding and storage failures surface as errors. An empty corpus
    /// gives an empty list, and a failed rerank falls back to hybrid scores.
    pub async fn rank(
        &self,
        resume_id: &str,
        top_k: usize,
        use_llm_rerank: bool,
    ) -> Result<Vec<Candidate>, AppError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let query_text =
            resume_query_text(self.resumes_index, resume_id, self.config.resume_chunks).await?;
        if query_text.trim().is_empty() {
            match self.config.empty_resume {
                EmptyResumePolicy::Skip => {
                    warn!("Resume {resume_id} has no stored chunks; skipping match");
                    return Ok(Vec::new());
                }
                EmptyResumePolicy::Embed => {
                    warn!("Resume {resume_id} has no stored chunks; embedding empty query text");
                }
            }
        }

        let hits = retrieve(
            self.embedder,
            self.jobs_index,
            &query_text,
            top_k,
            self.config.max_embed_chars,
        )
        .await?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates = score_candidates(&query_text, hits, &self.config.weights);
        info!(
            "Hybrid retrieval produced {} jobs (top_k={top_k})",
            candidates.len()
        );

        if use_llm_rerank && !candidates.is_empty() {
            let matches = match rerank(self.chat, &query_text, &candidates, self.config).await {
                Ok(matches) => matches,
                Err(e) => {
                    warn!("LLM rerank skipped due to provider error: {e}");
                    HashMap::new()
                }
            };
            attach_matches(&mut candidates, matches);
            info!(
                "LLM scores applied to {}/{} jobs",
                candidates.iter().filter(|c| c.match_result.is_some()).count(),
                candidates.len()
            );
        }

        sort_candidates(&mut candidates);

        let record = MatchRunRecord {
            run_id,
            resume_id: resume_id.to_string(),
            started_at,
            finished_at: Utc::now(),
            top_k: i32::try_from(top_k).unwrap_or(i32::MAX),
            notes: if use_llm_rerank { "llm" } else { "no-llm" }.to_string(),
        };
        if let Err(e) = self.store.log_match_run(&record).await {
            warn!("Failed to log match run {run_id}: {e}");
        }
        info!("Match rank run {run_id} completed");

        Ok(candidates)
    }
}

/// Builds candidates from index hits, scoring each against the query text.
pub fn score_candidates(
    query_text: &str,
    hits: Vec<VectorHit>,
    weights: &HybridWeights,
) -> Vec<Candidate> {
    hits.into_iter()
        .map(|hit| {
            let meta = |key: &str| -> String {
                hit.metadata
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let doc_text = strip_html(&hit.document);
            let description = strip_html(&meta("description"));
            let distance_score = distance_to_score(hit.distance);
            let keyword_score = keyword_overlap(query_text, &doc_text);

            Candidate {
                job_id: hit.id.clone(),
                title: meta("title"),
                company: meta("company"),
                url: meta("url"),
                source: meta("source"),
                posted_at: hit
                    .metadata
                    .get("posted_at")
                    .and_then(Value::as_str)
                    .map(String::from),
                distance: hit.distance,
                description: if description.is_empty() {
                    doc_text
                } else {
                    description
                },
                distance_score,
                keyword_score,
                hybrid_score: hybrid_score(distance_score, keyword_score, weights),
                match_result: None,
            }
        })
        .collect()
}

fn attach_matches(
    candidates: &mut [Candidate],
    mut matches: HashMap<String, MatchResult>,
) {
    for candidate in candidates.iter_mut() {
        if let Some(result) = matches.remove(&candidate.job_id) {
            candidate.match_result = Some(result);
        }
    }
}

/// Descending by rerank score when present, else hybrid score. Stable, so
/// ties keep retrieval order.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.rank_score().cmp(&a.rank_score()));
}
