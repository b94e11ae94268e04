//! Prompt rendering, the model call and answer cleanup.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::core::config::LlmSettings;
use crate::dataset::Document;
use crate::llm::{ChatRequest, LlmProvider};

pub const EMPTY_ANSWER: &str = "پاسخی تولید نشد.";
pub const GENERATION_ERROR_PREFIX: &str = "خطا در تولید پاسخ از مدل:";

const PROMPT_TEMPLATE: &str = "
You are a helpful assistant.

Rule 1: If the user query matches or is similar to the 'Incident' or 'Conditions' in the context, return the corresponding 'Decision'.
Rule 2: If the query is casual (e.g., \"سلام\"), respond briefly and friendly in Persian.
Rule 3: If no match is found, try to mix 'Incident' and 'Conditions' to make up some 'Decision' to replay.

Context:
{context}

User Query: {question}

Respond strictly following the rules.
";

fn think_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("static regex"))
}

pub fn build_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|doc| doc.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replacen("{context}", context, 1)
        .replacen("{question}", question, 1)
}

/// Drops every `<think>…</think>` span and trims. Unpaired markers stay.
pub fn clean_answer(raw: &str) -> String {
    think_block().replace_all(raw, "").trim().to_string()
}

pub struct AnswerGenerator {
    provider: Arc<dyn LlmProvider>,
    settings: LlmSettings,
}

impl AnswerGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: LlmSettings) -> Self {
        Self { provider, settings }
    }

    pub fn model(&self) -> &str {
        &self.settings.chat_model
    }

    /// Always yields displayable text: the cleaned answer, the empty-answer
    /// placeholder, or the error marker with the failure detail.
    pub async fn generate(&self, user_query: &str, documents: &[Document]) -> String {
        let prompt = render_prompt(&build_context(documents), user_query);
        let request = ChatRequest::single(prompt).with_settings(&self.settings);

        match self.provider.chat(request, &self.settings.chat_model).await {
            Ok(raw) => {
                let answer = clean_answer(&raw);
                if answer.is_empty() {
                    tracing::debug!("Model returned an empty answer");
                    EMPTY_ANSWER.to_string()
                } else {
                    answer
                }
            }
            Err(err) => {
                tracing::warn!("Generation failed: {}", err);
                format!("{} {}", GENERATION_ERROR_PREFIX, err)
            }
        }
    }
}
