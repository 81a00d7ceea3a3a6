//! Resume ingestion: extract text from an upload, chunk it, embed each
//! chunk into the resume index, and record the resume.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::EmbeddingProvider;
use crate::models::resume::ResumeRow;
use crate::resumes::chunking::{chunk_text, DEFAULT_MAX_CHARS, DEFAULT_OVERLAP};
use crate::storage::{JobStore, VectorIndex, VectorRecord};

/// Extracts plain text from an uploaded resume.
///
/// Supports `.pdf`, `.txt` and `.md`; `.docx` is rejected. Runs of three or
/// more newlines collapse to one blank line and the result is trimmed.
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, AppError> {
    let suffix = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let raw = match suffix.as_str() {
        "pdf" => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| AppError::Validation(format!("Could not read PDF '{filename}': {e}")))?,
        "txt" | "md" => String::from_utf8(bytes.to_vec())
            .map_err(|_| AppError::Validation(format!("'{filename}' is not valid UTF-8 text")))?,
        other => {
            return Err(AppError::Validation(format!(
                "Unsupported file type: '.{other}'"
            )))
        }
    };

    Ok(collapse_blank_lines(&raw.replace("\r\n", "\n"))
        .trim()
        .to_string())
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    for c in text.chars() {
        if c == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else {
            newlines = 0;
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestedResume {
    pub resume_id: String,
    pub filename: String,
    pub chunks: usize,
}

pub struct ResumeIngest<'a> {
    pub store: &'a dyn JobStore,
    pub resumes_index: &'a dyn VectorIndex,
    pub embedder: &'a dyn EmbeddingProvider,
}

impl ResumeIngest<'_> {
    pub async fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<IngestedResume, AppError> {
        let text = extract_text(filename, bytes)?;
        if text.is_empty() {
            return Err(AppError::Validation(format!(
                "No text could be extracted from '{filename}'"
            )));
        }

        let chunks = chunk_text(&text, DEFAULT_MAX_CHARS, DEFAULT_OVERLAP);
        let resume_id = Uuid::new_v4().to_string();

        let mut records = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.into_iter().enumerate() {
            let embedding = self
                .embedder
                .embed(&chunk)
                .await
                .map_err(|e| AppError::Llm(format!("Embedding resume chunk {i} failed: {e}")))?;
            records.push(VectorRecord {
                id: format!("{resume_id}:{i}"),
                document: chunk,
                metadata: json!({
                    "resume_id": resume_id,
                    "chunk_index": i,
                    "source_file": filename,
                }),
                embedding,
            });
        }
        let chunk_count = records.len();

        self.resumes_index.add(records).await?;
        self.store
            .insert_resume(&ResumeRow {
                resume_id: resume_id.clone(),
                filename: filename.to_string(),
                added_at: Utc::now(),
            })
            .await?;

        info!("Ingested resume {resume_id} with {chunk_count} chunks");
        Ok(IngestedResume {
            resume_id,
            filename: filename.to_string(),
            chunks: chunk_count,
        })
    }
}
