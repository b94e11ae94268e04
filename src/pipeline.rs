//! One submission: normalize, fetch, generate, append.

use serde::Serialize;

use crate::core::errors::ApiError;
use crate::dataset::Document;
use crate::generation::AnswerGenerator;
use crate::normalize::normalize;
use crate::rag::Retriever;
use crate::session::{ChatSession, ChatTurn, SessionManager};

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub turn: ChatTurn,
    pub documents: Vec<Document>,
}

pub struct ChatPipeline {
    retriever: Retriever,
    generator: AnswerGenerator,
    top_k: usize,
}

impl ChatPipeline {
    pub fn new(retriever: Retriever, generator: AnswerGenerator, top_k: usize) -> Self {
        Self {
            retriever,
            generator,
            top_k,
        }
    }

    /// Retrieval and generation without touching any transcript.
    pub async fn answer(&self, raw_query: &str) -> (String, Vec<Document>) {
        let normalized = normalize(raw_query);
        if normalized.is_empty() {
            tracing::debug!("Query has no Persian text; retrieving with an empty query");
        }
        let documents = self.retriever.fetch(&normalized, self.top_k).await;

        let answer = self.generator.generate(raw_query, &documents).await;
        (answer, documents)
    }

    /// Always appends exactly one turn to `session`.
    pub async fn submit(&self, session: &mut ChatSession, raw_query: &str) -> PipelineOutcome {
        let (answer, documents) = self.answer(raw_query).await;
        let turn = session.append(raw_query, &answer);
        PipelineOutcome { turn, documents }
    }

    /// Same as [`submit`](Self::submit) for a managed session. The session
    /// map is only locked to append the finished turn.
    pub async fn submit_to(
        &self,
        sessions: &SessionManager,
        session_id: &str,
        raw_query: &str,
    ) -> Result<PipelineOutcome, ApiError> {
        if !sessions.exists(session_id).await {
            return Err(session_not_found(session_id));
        }

        let (answer, documents) = self.answer(raw_query).await;
        let turn = sessions
            .append(session_id, raw_query, &answer)
            .await
            .ok_or_else(|| session_not_found(session_id))?;

        tracing::info!(
            "Session {}: answered with {} context documents",
            session_id,
            documents.len()
        );
        Ok(PipelineOutcome { turn, documents })
    }
}

fn session_not_found(session_id: &str) -> ApiError {
    ApiError::NotFound(format!("Session not found: {}", session_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::core::config::{LlmSettings, RetrievalSettings};
    use crate::dataset::documents_from_value;
    use crate::generation::GENERATION_ERROR_PREFIX;
    use crate::llm::mock::MockProvider;
    use crate::rag::EmbeddingIndex;

    fn scenario_documents() -> Vec<Document> {
        let value = json!({
            "all_data": [{
                "person": "X",
                "datas": [{
                    "Incident": "فلان رخداد",
                    "Conditions": "شرایط خاص",
                    "Decision": "تصمیم الف"
                }]
            }]
        });
        documents_from_value(&value, "all_data")
    }

    async fn pipeline(provider: Arc<MockProvider>, with_index: bool) -> ChatPipeline {
        let index = if with_index {
            let index = EmbeddingIndex::build(provider.clone(), "bge-m3", scenario_documents(), 32)
                .await
                .unwrap();
            Some(Arc::new(index))
        } else {
            None
        };
        let settings = RetrievalSettings::default();
        ChatPipeline::new(
            Retriever::new(index, &settings),
            AnswerGenerator::new(provider, LlmSettings::default()),
            settings.top_k,
        )
    }

    #[tokio::test]
    async fn end_to_end_surfaces_matching_decision() {
        let provider = Arc::new(MockProvider::replying(
            "<think>rule 1 applies</think>\nتصمیم الف گرفته شد.",
        ));
        let pipeline = pipeline(provider.clone(), true).await;
        let mut session = ChatSession::new();

        let query = "در شرایط خاص چه تصمیمی گرفته شد؟";
        let outcome = pipeline.submit(&mut session, query).await;

        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].metadata.person, "X");
        assert_eq!(outcome.documents[0].text, "فلان رخداد\nشرایط خاص\nتصمیم الف");
        assert_eq!(outcome.turn.user_text, query);
        assert_eq!(outcome.turn.bot_text, "تصمیم الف گرفته شد.");
        assert_eq!(session.all_turns(), &[outcome.turn.clone()]);

        let prompt = provider.last_prompt().unwrap();
        assert!(prompt.contains("فلان رخداد\nشرایط خاص\nتصمیم الف"));
        assert!(prompt.contains(query));
    }

    #[tokio::test]
    async fn generation_failure_still_appends_turn() {
        let provider = Arc::new(MockProvider::failing_chat("model offline"));
        let pipeline = pipeline(provider, true).await;
        let mut session = ChatSession::new();

        let outcome = pipeline.submit(&mut session, "شرایط خاص").await;

        assert_eq!(session.len(), 1);
        assert!(outcome.turn.bot_text.starts_with(GENERATION_ERROR_PREFIX));
        assert!(outcome.turn.bot_text.contains("model offline"));
    }

    #[tokio::test]
    async fn missing_index_answers_with_empty_context() {
        let provider = Arc::new(MockProvider::replying("سلام!"));
        let pipeline = pipeline(provider.clone(), false).await;
        let mut session = ChatSession::new();

        let outcome = pipeline.submit(&mut session, "سلام").await;

        assert!(outcome.documents.is_empty());
        assert_eq!(outcome.turn.bot_text, "سلام!");
        assert!(provider.last_prompt().unwrap().contains("Context:\n\n"));
    }

    #[tokio::test]
    async fn non_persian_query_still_gets_context() {
        let provider = Arc::new(MockProvider::replying("ok"));
        let pipeline = pipeline(provider.clone(), true).await;
        let mut session = ChatSession::new();

        let outcome = pipeline
            .submit(&mut session, "what was decided about the fire?")
            .await;

        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.turn.user_text, "what was decided about the fire?");
        let prompt = provider.last_prompt().unwrap();
        assert!(prompt.contains("فلان رخداد\nشرایط خاص\nتصمیم الف"));
        assert!(prompt.contains("User Query: what was decided about the fire?"));
    }

    #[tokio::test]
    async fn managed_sessions_receive_turns() {
        let provider = Arc::new(MockProvider::replying("تصمیم الف"));
        let pipeline = pipeline(provider, true).await;
        let sessions = SessionManager::new();
        let id = sessions.create().await;

        let outcome = pipeline.submit_to(&sessions, &id, "شرایط خاص").await.unwrap();

        assert_eq!(sessions.turns(&id).await.unwrap(), vec![outcome.turn]);
        let missing = pipeline.submit_to(&sessions, "nope", "شرایط خاص").await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }
}
