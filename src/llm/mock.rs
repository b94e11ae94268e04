use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::errors::ApiError;
use super::provider::LlmProvider;
use super::types::ChatRequest;

const DIMENSION: usize = 64;

/// Deterministic stand-in for a model server.
///
/// Embeddings are hashed bags of words, so texts sharing words score closer.
pub(crate) struct MockProvider {
    reply: Result<String, String>,
    embed_available: bool,
    pub prompts: Mutex<Vec<String>>,
    pub embed_calls: AtomicUsize,
}

impl MockProvider {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            embed_available: true,
            prompts: Mutex::new(Vec::new()),
            embed_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_chat(detail: &str) -> Self {
        Self {
            reply: Err(detail.to_string()),
            ..Self::replying("")
        }
    }

    pub fn without_embeddings(mut self) -> Self {
        self.embed_available = false;
        self
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().ok()?.last().cloned()
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSION];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            vector[(hasher.finish() as usize) % DIMENSION] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(self.embed_available)
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
        if let Some(message) = request.messages.last() {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(message.content.clone());
            }
        }
        self.reply.clone().map_err(ApiError::ServiceUnavailable)
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if !self.embed_available {
            return Err(ApiError::ServiceUnavailable("connection refused".to_string()));
        }
        Ok(inputs.iter().map(|text| Self::vector_for(text)).collect())
    }
}
