//! The ingestion run: pull postings from every configured source, store the
//! new ones, and index them for retrieval.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::dedupe::{is_duplicate, stable_id};
use crate::jobs::sources::JobSource;
use crate::llm_client::EmbeddingProvider;
use crate::models::run::JobRunRecord;
use crate::storage::{JobStore, MetadataFilter, VectorIndex, VectorRecord};
use crate::text::strip_html;

pub struct JobScout<'a> {
    pub sources: &'a [Arc<dyn JobSource>],
    pub store: &'a dyn JobStore,
    pub jobs_index: &'a dyn VectorIndex,
    pub embedder: &'a dyn EmbeddingProvider,
}

impl JobScout<'_> {
    /// Runs one ingestion pass and returns the number of postings added per
    /// source. Postings already seen in this run or already stored are not
    /// counted. A stored posting with no index record is indexed again.
    pub async fn run_search(
        &self,
        query: &str,
        limit_per_source: usize,
    ) -> Result<BTreeMap<String, usize>, AppError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut seen = HashSet::new();
        let mut summary = BTreeMap::new();

        for source in self.sources {
            let postings = source.search(query, limit_per_source).await;
            let mut added = 0;

            for mut posting in postings {
                if posting.job_id.is_empty() {
                    posting.job_id = stable_id(
                        &posting.title,
                        &posting.company,
                        posting.location.as_deref(),
                        &posting.url,
                    );
                }
                if is_duplicate(&mut seen, &posting) {
                    continue;
                }
                posting.description = strip_html(&posting.description);

                let document = posting.document_text();
                let embedding = self.embedder.embed(&document).await.map_err(|e| {
                    AppError::Llm(format!("Embedding job {} failed: {e}", posting.job_id))
                })?;
                if embedding.is_empty() {
                    warn!("Empty embedding for job {}; not indexed", posting.job_id);
                    continue;
                }

                let inserted = self.store.insert_job(&posting).await?;
                if !inserted && !self.missing_from_index(&posting.job_id).await? {
                    continue;
                }
                let metadata = serde_json::to_value(&posting).unwrap_or(Value::Null);
                self.jobs_index
                    .add(vec![VectorRecord {
                        id: posting.job_id.clone(),
                        document,
                        metadata,
                        embedding,
                    }])
                    .await?;
                if inserted {
                    added += 1;
                } else {
                    info!("Re-indexed stored job {} missing from the index", posting.job_id);
                }
            }

            *summary.entry(source.name().to_string()).or_insert(0) += added;
        }

        let total_added: usize = summary.values().sum();
        let record = JobRunRecord {
            run_id,
            query: query.to_string(),
            started_at,
            finished_at: Utc::now(),
            added_count: i32::try_from(total_added).unwrap_or(i32::MAX),
            source_summary: serde_json::to_string(&summary).unwrap_or_default(),
        };
        if let Err(e) = self.store.log_job_run(&record).await {
            warn!("Failed to log job run {run_id}: {e}");
        }
        info!("Job scout run {run_id} added {total_added} jobs");

        Ok(summary)
    }

    /// True when `job_id` is in the store but has no index record, which
    /// happens when an earlier run failed between the insert and the add.
    async fn missing_from_index(&self, job_id: &str) -> Result<bool, AppError> {
        if self.store.get_job(job_id).await?.is_none() {
            return Ok(false);
        }
        let records = self
            .jobs_index
            .get(&MetadataFilter::eq("job_id", job_id), Some(1))
            .await?;
        Ok(records.is_empty())
    }
}
