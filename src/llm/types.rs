use serde::{Deserialize, Serialize};

use crate::core::config::LlmSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<i32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }

    /// Single-turn request: one user message, no history.
    pub fn single(prompt: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::user(prompt)])
    }

    pub fn with_settings(mut self, settings: &LlmSettings) -> Self {
        self.temperature = settings.temperature.or(self.temperature);
        self.top_p = settings.top_p.or(self.top_p);
        self.max_tokens = settings.max_tokens.or(self.max_tokens);
        self
    }
}
