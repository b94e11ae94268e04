pub mod ollama;
pub mod openai;
pub mod provider;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{LlmSettings, ProviderKind};
use crate::core::errors::ApiError;

pub use ollama::OllamaProvider;
pub use openai::OpenAiCompatProvider;
pub use provider::LlmProvider;
pub use types::{ChatMessage, ChatRequest};

/// Builds the configured backend; both embedding and generation go through it.
pub fn build_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, ApiError> {
    let timeout = Duration::from_secs(settings.request_timeout_secs);
    let base_url = settings.base_url();
    tracing::info!(
        "Using {:?} backend at {} (chat: {}, embeddings: {})",
        settings.provider,
        base_url,
        settings.chat_model,
        settings.embedding_model
    );

    let provider: Arc<dyn LlmProvider> = match settings.provider {
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(base_url, timeout)?),
        ProviderKind::OpenAi => Arc::new(OpenAiCompatProvider::new(
            base_url,
            settings.api_key.clone(),
            timeout,
        )?),
    };
    Ok(provider)
}
