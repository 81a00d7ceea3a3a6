//! In-memory stand-ins for the embedding and chat providers.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm_client::{
    ChatMessage, ChatProvider, ChatReply, EmbeddingProvider, LlmError, ResponseFormat,
};

/// Returns a fixed vector per exact input text, or `fallback` for anything else.
pub struct FixedEmbedder {
    pub by_text: HashMap<String, Vec<f32>>,
    pub fallback: Vec<f32>,
    pub calls: Mutex<Vec<String>>,
}

impl FixedEmbedder {
    pub fn constant(vector: Vec<f32>) -> Self {
        Self {
            by_text: HashMap::new(),
            fallback: vector,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.calls.lock().unwrap().push(text.to_string());
        Ok(self
            .by_text
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Always fails as if the provider were down.
pub struct FailingProvider;

fn provider_down() -> LlmError {
    LlmError::Api {
        provider: "Ollama",
        status: 503,
        message: "model not loaded".to_string(),
    }
}

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
        Err(provider_down())
    }
}

#[async_trait]
impl ChatProvider for FailingProvider {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _format: Option<ResponseFormat>,
    ) -> Result<ChatReply, LlmError> {
        Err(provider_down())
    }
}

/// Replays scripted replies in order; the last one repeats once exhausted.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<ChatReply>>,
    last: Mutex<Option<ChatReply>>,
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    pub fn new(replies: Vec<ChatReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(replies: &[&str]) -> Self {
        Self::new(
            replies
                .iter()
                .map(|r| ChatReply::Text(r.to_string()))
                .collect(),
        )
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _format: Option<ResponseFormat>,
    ) -> Result<ChatReply, LlmError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let next = self.replies.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(reply) = next {
            *last = Some(reply);
        }
        Ok(last
            .clone()
            .unwrap_or_else(|| ChatReply::Text(String::new())))
    }
}
