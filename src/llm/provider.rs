use async_trait::async_trait;

use crate::core::errors::ApiError;
use super::types::ChatRequest;

/// A model server able to both embed text and complete chats.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "ollama", "openai")
    fn name(&self) -> &str;

    /// check if the provider is reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError>;

    /// one embedding per input, in input order
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}
