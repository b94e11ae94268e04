use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::validate_config;
use crate::core::errors::ApiError;

pub const DEFAULT_CHAT_MODEL: &str = "qwen3:latest";
pub const DEFAULT_EMBEDDING_MODEL: &str = "bge-m3";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OPENAI_URL: &str = "http://localhost:1234";

/// Typed view over `config.yml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    pub server: ServerSettings,
    pub dataset: DatasetSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Extra CORS origins for the JSON API; empty means local origins only.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    pub path: String,
    /// Top-level key holding the per-person groups.
    pub root_key: String,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            path: "data/Leaders_data.json".to_string(),
            root_key: "all_data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "openai", alias = "lmstudio")]
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<i32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            base_url: None,
            api_key: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            request_timeout_secs: 120,
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }
}

impl LlmSettings {
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => match self.provider {
                ProviderKind::Ollama => DEFAULT_OLLAMA_URL.to_string(),
                ProviderKind::OpenAi => DEFAULT_OPENAI_URL.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// k passed to every fetch.
    pub top_k: usize,
    /// k baked into the retriever handle.
    pub retriever_k: usize,
    pub similarity_threshold: Option<f32>,
    pub embed_batch_size: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            retriever_k: 10,
            similarity_threshold: None,
            embed_batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub to_file: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            to_file: true,
        }
    }
}

impl BotSettings {
    pub fn from_config(config: &Value) -> Result<Self, ApiError> {
        validate_config(config)?;
        // bare `llm:` or `top_k:` parse as null; treat them as unset
        let mut sections = config.clone();
        strip_nulls(&mut sections);
        serde_json::from_value(sections)
            .map_err(|e| ApiError::BadRequest(format!("Invalid configuration: {}", e)))
    }
}

fn strip_nulls(value: &mut Value) {
    if let Value::Object(map) = value {
        map.retain(|_, child| !child.is_null());
        map.values_mut().for_each(strip_nulls);
    }
}
