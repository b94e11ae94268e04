use std::sync::Arc;

use crate::core::config::{BotSettings, ConfigService};
use crate::dataset::{self, Document};
use crate::generation::AnswerGenerator;
use crate::llm::{build_provider, LlmProvider};
use crate::pipeline::ChatPipeline;
use crate::rag::{EmbeddingIndex, Retriever};
use crate::session::SessionManager;

pub mod error;

use error::InitializationError;

/// Shared state behind every route.
///
/// Everything except `sessions` is read-only once built.
pub struct AppState {
    pub config: ConfigService,
    pub settings: BotSettings,
    pub provider: Arc<dyn LlmProvider>,
    pub index: Option<Arc<EmbeddingIndex>>,
    pub pipeline: ChatPipeline,
    pub sessions: SessionManager,
    pub document_count: usize,
}

impl AppState {
    /// Loads the dataset, connects the configured backend and builds the index.
    ///
    /// A missing or malformed dataset is fatal. An index build failure is not:
    /// the bot then answers with an empty context.
    pub async fn initialize(
        config: ConfigService,
        settings: BotSettings,
    ) -> Result<Arc<Self>, InitializationError> {
        let dataset_path = config.paths().resolve(&settings.dataset.path);
        let documents = dataset::load(&dataset_path, &settings.dataset.root_key)
            .map_err(|e| InitializationError::Dataset(e.into()))?;

        let provider =
            build_provider(&settings.llm).map_err(|e| InitializationError::Llm(e.into()))?;

        Ok(Self::assemble(config, settings, provider, documents).await)
    }

    pub async fn assemble(
        config: ConfigService,
        settings: BotSettings,
        provider: Arc<dyn LlmProvider>,
        documents: Vec<Document>,
    ) -> Arc<Self> {
        let document_count = documents.len();
        let index = match EmbeddingIndex::build(
            provider.clone(),
            &settings.llm.embedding_model,
            documents,
            settings.retrieval.embed_batch_size,
        )
        .await
        {
            Ok(index) => Some(Arc::new(index)),
            Err(err) => {
                tracing::warn!(
                    "Embedding index unavailable, retrieval will return no documents: {}",
                    err
                );
                None
            }
        };

        let retriever = Retriever::new(index.clone(), &settings.retrieval);
        let generator = AnswerGenerator::new(provider.clone(), settings.llm.clone());
        let pipeline = ChatPipeline::new(retriever, generator, settings.retrieval.top_k);

        Arc::new(AppState {
            config,
            settings,
            provider,
            index,
            pipeline,
            sessions: SessionManager::new(),
            document_count,
        })
    }
}
