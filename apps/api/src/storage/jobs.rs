//! Relational store for postings, resumes and run logs.
//!
//! Inserts are append-only; `url` is unique so postings seen in an earlier
//! run are ignored rather than duplicated.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use crate::models::job::{JobPosting, JobRow};
use crate::models::resume::ResumeRow;
use crate::models::run::{JobRunRecord, MatchRunRecord};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert-or-ignore. Returns `true` only when a new row was written.
    async fn insert_job(&self, posting: &JobPosting) -> Result<bool, sqlx::Error>;
    async fn get_job(&self, job_id: &str) -> Result<Option<JobRow>, sqlx::Error>;
    /// Most recently added first.
    async fn list_jobs(&self, limit: i64, source: Option<&str>) -> Result<Vec<JobRow>, sqlx::Error>;

    async fn insert_resume(&self, resume: &ResumeRow) -> Result<(), sqlx::Error>;
    async fn list_resumes(&self) -> Result<Vec<ResumeRow>, sqlx::Error>;

    async fn log_job_run(&self, run: &JobRunRecord) -> Result<(), sqlx::Error>;
    async fn log_match_run(&self, run: &MatchRunRecord) -> Result<(), sqlx::Error>;
    async fn list_job_runs(&self, limit: i64) -> Result<Vec<JobRunRecord>, sqlx::Error>;
    async fn list_match_runs(&self, limit: i64) -> Result<Vec<MatchRunRecord>, sqlx::Error>;

    /// Deletes all postings and ingestion run logs.
    async fn wipe_jobs(&self) -> Result<(), sqlx::Error>;
    /// Deletes all resumes and ranking run logs.
    async fn wipe_resumes(&self) -> Result<(), sqlx::Error>;
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert_job(&self, posting: &JobPosting) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs
                (job_id, title, company, location, url, source, posted_at, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&posting.job_id)
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.location)
        .bind(&posting.url)
        .bind(&posting.source)
        .bind(posting.posted_at)
        .bind(&posting.description)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<JobRow>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_jobs(&self, limit: i64, source: Option<&str>) -> Result<Vec<JobRow>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM jobs
            WHERE ($1::TEXT IS NULL OR source = $1)
            ORDER BY added_at DESC
            LIMIT $2
            "#,
        )
        .bind(source)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn insert_resume(&self, resume: &ResumeRow) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO resumes (resume_id, filename, added_at) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(&resume.resume_id)
        .bind(&resume.filename)
        .bind(resume.added_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_resumes(&self) -> Result<Vec<ResumeRow>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM resumes ORDER BY added_at DESC")
            .fetch_all(&self.pool)
            .await
    }

    async fn log_job_run(&self, run: &JobRunRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO job_runs
                (run_id, query, started_at, finished_at, added_count, source_summary)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(run.run_id)
        .bind(&run.query)
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run.added_count)
        .bind(&run.source_summary)
        .execute(&self.pool)
        .await?;
        info!("Logged job run {}", run.run_id);
        Ok(())
    }

    async fn log_match_run(&self, run: &MatchRunRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO match_runs
                (run_id, resume_id, started_at, finished_at, top_k, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(run.run_id)
        .bind(&run.resume_id)
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run.top_k)
        .bind(&run.notes)
        .execute(&self.pool)
        .await?;
        info!("Logged match run {}", run.run_id);
        Ok(())
    }

    async fn list_job_runs(&self, limit: i64) -> Result<Vec<JobRunRecord>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM job_runs ORDER BY started_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn list_match_runs(&self, limit: i64) -> Result<Vec<MatchRunRecord>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM match_runs ORDER BY started_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn wipe_jobs(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM jobs").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM job_runs").execute(&mut *tx).await?;
        tx.commit().await
    }

    async fn wipe_resumes(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM resumes").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM match_runs").execute(&mut *tx).await?;
        tx.commit().await
    }
}

#[derive(Debug, Default)]
struct MemoryTables {
    jobs: Vec<JobRow>,
    resumes: Vec<ResumeRow>,
    job_runs: Vec<JobRunRecord>,
    match_runs: Vec<MatchRunRecord>,
}

/// Store kept entirely in process memory; mirrors `PgJobStore` semantics.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut MemoryTables) -> T) -> T {
        let mut guard = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

fn newest_first<T: Clone>(rows: &[T], limit: i64) -> Vec<T> {
    rows.iter()
        .rev()
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_job(&self, posting: &JobPosting) -> Result<bool, sqlx::Error> {
        Ok(self.with(|t| {
            let exists = t
                .jobs
                .iter()
                .any(|r| r.posting.job_id == posting.job_id || r.posting.url == posting.url);
            if !exists {
                t.jobs.push(JobRow {
                    posting: posting.clone(),
                    added_at: Utc::now(),
                });
            }
            !exists
        }))
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<JobRow>, sqlx::Error> {
        Ok(self.with(|t| t.jobs.iter().find(|r| r.posting.job_id == job_id).cloned()))
    }

    async fn list_jobs(&self, limit: i64, source: Option<&str>) -> Result<Vec<JobRow>, sqlx::Error> {
        Ok(self.with(|t| {
            let filtered: Vec<JobRow> = t
                .jobs
                .iter()
                .filter(|r| source.map_or(true, |s| r.posting.source == s))
                .cloned()
                .collect();
            newest_first(&filtered, limit)
        }))
    }

    async fn insert_resume(&self, resume: &ResumeRow) -> Result<(), sqlx::Error> {
        self.with(|t| {
            if !t.resumes.iter().any(|r| r.resume_id == resume.resume_id) {
                t.resumes.push(resume.clone());
            }
        });
        Ok(())
    }

    async fn list_resumes(&self) -> Result<Vec<ResumeRow>, sqlx::Error> {
        Ok(self.with(|t| newest_first(&t.resumes, i64::MAX)))
    }

    async fn log_job_run(&self, run: &JobRunRecord) -> Result<(), sqlx::Error> {
        self.with(|t| t.job_runs.push(run.clone()));
        Ok(())
    }

    async fn log_match_run(&self, run: &MatchRunRecord) -> Result<(), sqlx::Error> {
        self.with(|t| t.match_runs.push(run.clone()));
        Ok(())
    }

    async fn list_job_runs(&self, limit: i64) -> Result<Vec<JobRunRecord>, sqlx::Error> {
        Ok(self.with(|t| newest_first(&t.job_runs, limit)))
    }

    async fn list_match_runs(&self, limit: i64) -> Result<Vec<MatchRunRecord>, sqlx::Error> {
        Ok(self.with(|t| newest_first(&t.match_runs, limit)))
    }

    async fn wipe_jobs(&self) -> Result<(), sqlx::Error> {
        self.with(|t| {
            t.jobs.clear();
            t.job_runs.clear();
        });
        Ok(())
    }

    async fn wipe_resumes(&self) -> Result<(), sqlx::Error> {
        self.with(|t| {
            t.resumes.clear();
            t.match_runs.clear();
        });
        Ok(())
    }
}
