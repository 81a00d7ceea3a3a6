pub mod jobs;
pub mod vector;

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::db::{create_pool, init_schema};

pub use jobs::{JobStore, MemoryJobStore, PgJobStore};
pub use vector::{IndexError, MemoryIndex, MetadataFilter, PgVectorIndex, VectorHit, VectorIndex, VectorRecord};

/// Collection holding one record per job posting.
pub const JOBS_COLLECTION: &str = "jobs";
/// Collection holding resume chunks, tagged with `resume_id`.
pub const RESUMES_COLLECTION: &str = "resumes";

/// The relational store plus both vector collections.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn JobStore>,
    pub jobs_index: Arc<dyn VectorIndex>,
    pub resumes_index: Arc<dyn VectorIndex>,
}

impl Backends {
    /// Process-local backends; everything is lost on restart.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryJobStore::new()),
            jobs_index: Arc::new(MemoryIndex::new(JOBS_COLLECTION)),
            resumes_index: Arc::new(MemoryIndex::new(RESUMES_COLLECTION)),
        }
    }

    /// Postgres when `database_url` is set, in-memory otherwise.
    pub async fn connect(database_url: Option<&str>) -> Result<Self> {
        let Some(url) = database_url else {
            warn!("DATABASE_URL is not set; jobs, resumes and run logs are kept in memory only");
            return Ok(Self::in_memory());
        };

        let db = create_pool(url).await?;
        init_schema(&db).await?;
        Ok(Self {
            store: Arc::new(PgJobStore::new(db.clone())),
            jobs_index: Arc::new(PgVectorIndex::new(db.clone(), JOBS_COLLECTION)),
            resumes_index: Arc::new(PgVectorIndex::new(db, RESUMES_COLLECTION)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobPosting;

    #[tokio::test]
    async fn test_connect_without_database_url_uses_memory_backends() {
        let backends = Backends::connect(None).await.unwrap();

        let posting = JobPosting {
            job_id: "j-1".to_string(),
            title: "Rust Engineer".to_string(),
            company: "Ferrous".to_string(),
            location: None,
            url: "https://ferrous.dev/jobs/1".to_string(),
            source: "dummy".to_string(),
            posted_at: None,
            description: "Build things".to_string(),
        };
        assert!(backends.store.insert_job(&posting).await.unwrap());
        assert!(!backends.store.insert_job(&posting).await.unwrap());
        assert_eq!(backends.store.list_jobs(10, None).await.unwrap().len(), 1);

        backends
            .jobs_index
            .add(vec![VectorRecord {
                id: "j-1".to_string(),
                document: "Rust Engineer at Ferrous".to_string(),
                metadata: serde_json::json!({"job_id": "j-1"}),
                embedding: vec![1.0, 0.0],
            }])
            .await
            .unwrap();
        let hits = backends.jobs_index.query(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(hits[0].id, "j-1");

        let err = backends.resumes_index.query(&[1.0, 0.0], 5).await.unwrap_err();
        assert!(matches!(err, IndexError::Empty(name) if name == RESUMES_COLLECTION));
    }
}
