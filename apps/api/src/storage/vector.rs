//! Nearest-neighbour index over embedded documents.
//!
//! Distances are squared Euclidean; lower means more similar.

use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index '{0}' has no records")]
    Empty(String),

    #[error("embedding dimension mismatch: index has {expected}, query has {got}")]
    Dimension { expected: usize, got: usize },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub document: String,
    pub metadata: Value,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    pub distance: f64,
    pub metadata: Value,
    pub document: String,
}

/// Equality filter on one top-level metadata key.
#[derive(Debug, Clone)]
pub struct MetadataFilter {
    pub key: String,
    pub value: Value,
}

impl MetadataFilter {
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    fn matches(&self, metadata: &Value) -> bool {
        metadata.get(&self.key) == Some(&self.value)
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top-`k` records nearest to `embedding`, closest first.
    /// Fails with `IndexError::Empty` when the index holds nothing.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<VectorHit>, IndexError>;

    /// Records matching `filter`, in insertion order.
    async fn get(
        &self,
        filter: &MetadataFilter,
        limit: Option<usize>,
    ) -> Result<Vec<VectorRecord>, IndexError>;

    /// Adds records. Ids already present are left untouched.
    async fn add(&self, records: Vec<VectorRecord>) -> Result<(), IndexError>;

    async fn clear(&self) -> Result<(), IndexError>;
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum()
}

/// Brute-force ranking shared by both index backends.
fn rank_records<'a>(
    name: &str,
    records: impl Iterator<Item = &'a VectorRecord>,
    embedding: &[f32],
    k: usize,
) -> Result<Vec<VectorHit>, IndexError> {
    let mut hits = Vec::new();
    for record in records {
        if record.embedding.len() != embedding.len() {
            return Err(IndexError::Dimension {
                expected: record.embedding.len(),
                got: embedding.len(),
            });
        }
        hits.push(VectorHit {
            id: record.id.clone(),
            distance: squared_l2(&record.embedding, embedding),
            metadata: record.metadata.clone(),
            document: record.document.clone(),
        });
    }
    if hits.is_empty() {
        return Err(IndexError::Empty(name.to_string()));
    }
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits.truncate(k);
    Ok(hits)
}

/// In-process index. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    name: String,
    records: RwLock<Vec<VectorRecord>>,
}

impl MemoryIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(Vec::new()),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<VectorHit>, IndexError> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        rank_records(&self.name, records.iter(), embedding, k)
    }

    async fn get(
        &self,
        filter: &MetadataFilter,
        limit: Option<usize>,
    ) -> Result<Vec<VectorRecord>, IndexError> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records
            .iter()
            .filter(|r| filter.matches(&r.metadata))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn add(&self, new_records: Vec<VectorRecord>) -> Result<(), IndexError> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        for record in new_records {
            if !records.iter().any(|r| r.id == record.id) {
                records.push(record);
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), IndexError> {
        self.records.write().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }
}

/// Postgres-backed index: one `vector_records` table partitioned by
/// collection name, embeddings stored as `REAL[]`, ranked in process.
#[derive(Clone)]
pub struct PgVectorIndex {
    pool: PgPool,
    collection: String,
}

impl PgVectorIndex {
    pub fn new(pool: PgPool, collection: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
        }
    }
}

/// `LIMIT` value for Postgres; saturates instead of wrapping negative.
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

type RecordTuple = (String, String, Value, Vec<f32>);

fn from_tuple((id, document, metadata, embedding): RecordTuple) -> VectorRecord {
    VectorRecord {
        id,
        document,
        metadata,
        embedding,
    }
}

#[async_trait]
impl VectorIndex for PgVectorIndex {
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<VectorHit>, IndexError> {
        let rows: Vec<RecordTuple> = sqlx::query_as(
            "SELECT id, document, metadata, embedding FROM vector_records WHERE collection = $1",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let records: Vec<VectorRecord> = rows.into_iter().map(from_tuple).collect();
        rank_records(&self.collection, records.iter(), embedding, k)
    }

    async fn get(
        &self,
        filter: &MetadataFilter,
        limit: Option<usize>,
    ) -> Result<Vec<VectorRecord>, IndexError> {
        let mut containment = serde_json::Map::new();
        containment.insert(filter.key.clone(), filter.value.clone());
        let rows: Vec<RecordTuple> = sqlx::query_as(
            r#"
            SELECT id, document, metadata, embedding
            FROM vector_records
            WHERE collection = $1 AND metadata @> $2
            ORDER BY seq
            LIMIT $3
            "#,
        )
        .bind(&self.collection)
        .bind(Value::Object(containment))
        .bind(limit.map(sql_limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(from_tuple).collect())
    }

    async fn add(&self, records: Vec<VectorRecord>) -> Result<(), IndexError> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO vector_records (collection, id, document, metadata, embedding)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (collection, id) DO NOTHING
                "#,
            )
            .bind(&self.collection)
            .bind(&record.id)
            .bind(&record.document)
            .bind(&record.metadata)
            .bind(&record.embedding)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), IndexError> {
        sqlx::query("DELETE FROM vector_records WHERE collection = $1")
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
