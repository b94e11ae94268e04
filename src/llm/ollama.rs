use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::core::errors::ApiError;
use super::provider::LlmProvider;
use super::types::ChatRequest;

/// Talks to a local Ollama server (`/api/chat`, `/api/embed`).
#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

fn chat_body(request: &ChatRequest, model_id: &str) -> Value {
    let mut options = Map::new();
    if let Some(t) = request.temperature { options.insert("temperature".to_string(), json!(t)); }
    if let Some(t) = request.top_p { options.insert("top_p".to_string(), json!(t)); }
    if let Some(t) = request.max_tokens { options.insert("num_predict".to_string(), json!(t)); }

    let mut body = json!({
        "model": model_id,
        "messages": request.messages,
        "stream": false,
    });
    if !options.is_empty() {
        if let Some(obj) = body.as_object_mut() {
            obj.insert("options".to_string(), Value::Object(options));
        }
    }
    body
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
        let url = format!("{}/api/chat", self.base_url);

        let res = self.client.post(&url)
            .json(&chat_body(&request, model_id))
            .send()
            .await
            .map_err(ApiError::unavailable)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Ollama chat error ({}): {}", status, text)));
        }

        let payload: OllamaChatResponse = res.json().await.map_err(ApiError::internal)?;
        Ok(payload.message.map(|m| m.content).unwrap_or_default())
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self.client.post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::unavailable)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Ollama embed error ({}): {}", status, text)));
        }

        let payload: OllamaEmbedResponse = res.json().await.map_err(ApiError::internal)?;
        if payload.embeddings.len() != inputs.len() {
            return Err(ApiError::Internal(format!(
                "Ollama returned {} embeddings for {} inputs",
                payload.embeddings.len(),
                inputs.len()
            )));
        }
        Ok(payload.embeddings)
    }
}
