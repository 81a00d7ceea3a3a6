//! Resume query construction and nearest-neighbour retrieval over the job index.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::EmbeddingProvider;
use crate::storage::{IndexError, MetadataFilter, VectorHit, VectorIndex};
use crate::text::truncate_chars;

/// Concatenates up to `top_n` stored chunks of a resume into query text.
/// A resume with no chunks yields an empty string.
pub async fn resume_query_text(
    resumes: &dyn VectorIndex,
    resume_id: &str,
    top_n: usize,
) -> Result<String, IndexError> {
    let chunks = resumes
        .get(&MetadataFilter::eq("resume_id", resume_id), Some(top_n))
        .await?;
    Ok(chunks
        .into_iter()
        .map(|r| r.document)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Embeds `query_text` (truncated to `max_embed_chars`) and returns the
/// `top_k` nearest jobs.
///
/// Embedding failures propagate. An empty embedding or an empty index is a
/// normal state and yields no hits.
pub async fn retrieve(
    embedder: &dyn EmbeddingProvider,
    jobs: &dyn VectorIndex,
    query_text: &str,
    top_k: usize,
    max_embed_chars: usize,
) -> Result<Vec<VectorHit>, AppError> {
    let embedding = embedder
        .embed(truncate_chars(query_text, max_embed_chars))
        .await
        .map_err(|e| AppError::Llm(format!("Embedding resume failed: {e}")))?;

    if embedding.is_empty() {
        warn!("Empty embedding returned for resume query; skipping match");
        return Ok(Vec::new());
    }

    match jobs.query(&embedding, top_k).await {
        Ok(hits) => {
            if hits.is_empty() {
                info!("No jobs in vector index to match against");
            }
            Ok(hits)
        }
        Err(IndexError::Empty(name)) => {
            warn!("Vector index '{name}' is empty; skipping match");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryIndex, VectorRecord};
    use crate::test_support::{FailingProvider, FixedEmbedder};
    use serde_json::json;

    fn chunk(resume_id: &str, idx: usize, text: &str) -> VectorRecord {
        VectorRecord {
            id: format!("{resume_id}:{idx}"),
            document: text.to_string(),
            metadata: json!({"resume_id": resume_id, "chunk_index": idx}),
            embedding: vec![0.0, 0.0],
        }
    }

    #[tokio::test]
    async fn test_resume_query_text_joins_first_chunks() {
        let index = MemoryIndex::new("resumes");
        index
            .add(vec![
                chunk("r1", 0, "Rust engineer"),
                chunk("r1", 1, "Tokio and Axum"),
                chunk("r2", 0, "Accountant"),
                chunk("r1", 2, "Kubernetes"),
                chunk("r1", 3, "ignored"),
            ])
            .await
            .unwrap();

        let text = resume_query_text(&index, "r1", 3).await.unwrap();
        assert_eq!(text, "Rust engineer\nTokio and Axum\nKubernetes");
    }

    #[tokio::test]
    async fn test_resume_query_text_unknown_resume_is_empty() {
        let index = MemoryIndex::new("resumes");
        assert_eq!(resume_query_text(&index, "missing", 3).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_retrieve_empty_index_returns_no_hits() {
        let embedder = FixedEmbedder::constant(vec![1.0, 0.0]);
        let jobs = MemoryIndex::new("jobs");
        let hits = retrieve(&embedder, &jobs, "rust", 5, 6000).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_empty_embedding_returns_no_hits() {
        let embedder = FixedEmbedder::constant(vec![]);
        let jobs = MemoryIndex::new("jobs");
        jobs.add(vec![chunk("j", 0, "job")]).await.unwrap();
        let hits = retrieve(&embedder, &jobs, "rust", 5, 6000).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_embedding_failure_propagates() {
        let jobs = MemoryIndex::new("jobs");
        let err = retrieve(&FailingProvider, &jobs, "rust", 5, 6000)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }

    #[tokio::test]
    async fn test_retrieve_truncates_query_before_embedding() {
        let embedder = FixedEmbedder::constant(vec![1.0]);
        let jobs = MemoryIndex::new("jobs");
        retrieve(&embedder, &jobs, "abcdefgh", 5, 3).await.unwrap();
        assert_eq!(*embedder.calls.lock().unwrap(), vec!["abc".to_string()]);
    }
}
