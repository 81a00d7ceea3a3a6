//! LLM client: the single point of entry for embedding and chat provider calls.
//!
//! Two providers are supported: a local Ollama server and any OpenAI-compatible
//! endpoint. Callers depend on the `EmbeddingProvider` / `ChatProvider` traits,
//! never on the HTTP shapes below.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

pub mod json;
pub mod settings;

pub use settings::{LlmSettings, Provider};

/// Retries after the first attempt, for connection and timeout failures only.
const MAX_RETRIES: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(1500);
const OLLAMA_TIMEOUT: Duration = Duration::from_secs(30);
const OPENAI_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} is not reachable; check base URL and connectivity")]
    Unreachable {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} error (status {status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Output-shape hint forwarded to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
}

/// A chat reply: raw text, or an already-structured JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    Text(String),
    Structured(serde_json::Value),
}

impl ChatReply {
    pub fn as_log_text(&self) -> String {
        match self {
            ChatReply::Text(text) => text.clone(),
            ChatReply::Structured(value) => value.to_string(),
        }
    }
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        format: Option<ResponseFormat>,
    ) -> Result<ChatReply, LlmError>;
}

// Wire shapes. Missing fields decode to empty values rather than errors.

#[derive(Debug, Default, Deserialize)]
struct OllamaEmbedResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<ChatMessageBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatMessageBody {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiEmbedResponse {
    #[serde(default)]
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiEmbedding {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    message: Option<ChatMessageBody>,
}

/// Provider client bound to one resolved `LlmSettings` value.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(client: Client, settings: LlmSettings) -> Self {
        Self { client, settings }
    }

    fn provider_label(&self) -> &'static str {
        match self.settings.provider {
            Provider::Ollama => "Ollama",
            Provider::OpenAi => "OpenAI",
        }
    }

    fn timeout(&self) -> Duration {
        match self.settings.provider {
            Provider::Ollama => OLLAMA_TIMEOUT,
            Provider::OpenAi => OPENAI_TIMEOUT,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// POSTs JSON to the provider.
    /// Connection and timeout errors are retried with a fixed backoff; any
    /// non-2xx status fails immediately with the response body.
    async fn post_with_retry(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<reqwest::Response, LlmError> {
        let url = self.endpoint(path);
        let provider = self.provider_label();
        let mut attempt = 0;

        loop {
            let mut request = self
                .client
                .post(&url)
                .timeout(self.timeout())
                .header("content-type", "application/json")
                .json(payload);
            if let Some(key) = self.settings.api_key.as_deref().filter(|k| !k.is_empty()) {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < MAX_RETRIES => {
                    attempt += 1;
                    warn!(
                        "{provider} call to {url} failed ({e}); retry {attempt}/{MAX_RETRIES} in {}ms",
                        RETRY_BACKOFF.as_millis()
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                    continue;
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    return Err(LlmError::Unreachable {
                        provider,
                        source: e,
                    });
                }
                Err(e) => return Err(LlmError::Http(e)),
            };

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    provider,
                    status: status.as_u16(),
                    message,
                });
            }

            debug!("{provider} call to {url} succeeded after {} attempt(s)", attempt + 1);
            return Ok(response);
        }
    }
}

#[async_trait]
impl EmbeddingProvider for LlmClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let model = &self.settings.embed_model;
        match self.settings.provider {
            Provider::Ollama => {
                let payload = json!({ "model": model, "prompt": text });
                let body: OllamaEmbedResponse =
                    self.post_with_retry("/api/embeddings", &payload).await?.json().await?;
                Ok(body.embedding)
            }
            Provider::OpenAi => {
                let payload = json!({ "model": model, "input": text });
                let body: OpenAiEmbedResponse =
                    self.post_with_retry("/embeddings", &payload).await?.json().await?;
                Ok(body
                    .data
                    .into_iter()
                    .next()
                    .map(|d| d.embedding)
                    .unwrap_or_default())
            }
        }
    }
}

#[async_trait]
impl ChatProvider for LlmClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        format: Option<ResponseFormat>,
    ) -> Result<ChatReply, LlmError> {
        let model = &self.settings.model;
        let content = match self.settings.provider {
            Provider::Ollama => {
                let mut payload = json!({ "model": model, "messages": messages, "stream": false });
                if format == Some(ResponseFormat::Json) {
                    payload["format"] = json!("json");
                }
                let body: OllamaChatResponse =
                    self.post_with_retry("/api/chat", &payload).await?.json().await?;
                body.message.and_then(|m| m.content)
            }
            Provider::OpenAi => {
                let mut payload = json!({ "model": model, "messages": messages });
                if format == Some(ResponseFormat::Json) {
                    payload["response_format"] = json!({ "type": "json_object" });
                }
                let body: OpenAiChatResponse =
                    self.post_with_retry("/chat/completions", &payload).await?.json().await?;
                body.choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message)
                    .and_then(|m| m.content)
            }
        };
        Ok(ChatReply::Text(content.unwrap_or_default()))
    }
}
