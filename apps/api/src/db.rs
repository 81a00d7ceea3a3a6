use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        job_id      TEXT PRIMARY KEY,
        title       TEXT NOT NULL,
        company     TEXT NOT NULL,
        location    TEXT,
        url         TEXT NOT NULL UNIQUE,
        source      TEXT NOT NULL,
        posted_at   TIMESTAMPTZ,
        description TEXT NOT NULL,
        added_at    TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS resumes (
        resume_id TEXT PRIMARY KEY,
        filename  TEXT NOT NULL,
        added_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_runs (
        run_id         UUID PRIMARY KEY,
        query          TEXT NOT NULL,
        started_at     TIMESTAMPTZ NOT NULL,
        finished_at    TIMESTAMPTZ NOT NULL,
        added_count    INTEGER NOT NULL,
        source_summary TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS match_runs (
        run_id      UUID PRIMARY KEY,
        resume_id   TEXT NOT NULL,
        started_at  TIMESTAMPTZ NOT NULL,
        finished_at TIMESTAMPTZ NOT NULL,
        top_k       INTEGER NOT NULL,
        notes       TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vector_records (
        seq        BIGSERIAL,
        collection TEXT NOT NULL,
        id         TEXT NOT NULL,
        document   TEXT NOT NULL,
        metadata   JSONB NOT NULL,
        embedding  REAL[] NOT NULL,
        PRIMARY KEY (collection, id)
    )
    "#,
];

/// Creates the tables this service owns if they do not exist yet.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema ready");
    Ok(())
}
