use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use super::provider::LlmProvider;
use super::types::ChatRequest;

/// OpenAI-compatible server (LM Studio, llama.cpp server, vLLM, ...).
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

fn chat_body(request: &ChatRequest, model_id: &str) -> Value {
    let mut body = json!({
        "model": model_id,
        "messages": request.messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
        if let Some(t) = request.top_p { obj.insert("top_p".to_string(), json!(t)); }
        if let Some(t) = request.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
    }
    body
}

/// Pulls vectors out of `{"data": [{"index": n, "embedding": [...]}]}`, ordered by index.
fn parse_embeddings(payload: &Value) -> Vec<Vec<f32>> {
    let mut items: Vec<(u64, Vec<f32>)> = payload["data"]
        .as_array()
        .map(|data| {
            data.iter()
                .enumerate()
                .filter_map(|(pos, item)| {
                    let vals = item["embedding"].as_array()?;
                    let index = item["index"].as_u64().unwrap_or(pos as u64);
                    let vec = vals.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect();
                    Some((index, vec))
                })
                .collect()
        })
        .unwrap_or_default();

    items.sort_by_key(|(index, _)| *index);
    items.into_iter().map(|(_, vec)| vec).collect()
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/v1/models", self.base_url);
        match self.authorized(self.client.get(&url)).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let res = self.authorized(self.client.post(&url))
            .json(&chat_body(&request, model_id))
            .send()
            .await
            .map_err(ApiError::unavailable)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Chat completion error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        Ok(payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self.authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::unavailable)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Embedding error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let embeddings = parse_embeddings(&payload);
        if embeddings.len() != inputs.len() {
            return Err(ApiError::Internal(format!(
                "Server returned {} embeddings for {} inputs",
                embeddings.len(),
                inputs.len()
            )));
        }
        Ok(embeddings)
    }
}
