//! Best-effort document retrieval.
//!
//! `Retriever::fetch` walks an ordered list of strategies. A strategy may be
//! unavailable (`Ok(None)`), fail (`Err`), or return documents; the first
//! non-empty result wins and exhaustion yields an empty list. Nothing here is
//! allowed to abort a user request.

use std::sync::Arc;

use async_trait::async_trait;

use super::index::{EmbeddingIndex, IndexRetriever};
use crate::core::config::RetrievalSettings;
use crate::core::errors::ApiError;
use crate::dataset::Document;

#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means this strategy has nothing to work with.
    async fn attempt(&self, query: &str, k: usize) -> Result<Option<Vec<Document>>, ApiError>;
}

/// Retriever handle's top-k, honouring its score threshold.
struct RelevantDocuments(Option<Arc<IndexRetriever>>);

/// Retriever handle's top-k, no threshold.
struct HandleRetrieve(Option<Arc<IndexRetriever>>);

struct SimilaritySearch(Option<Arc<EmbeddingIndex>>);

struct ScoredSimilaritySearch(Option<Arc<EmbeddingIndex>>);

/// Term overlap over the indexed documents; survives an embedding outage.
struct KeywordSearch(Option<Arc<EmbeddingIndex>>);

#[async_trait]
impl RetrievalStrategy for RelevantDocuments {
    fn name(&self) -> &'static str {
        "get_relevant_documents"
    }

    async fn attempt(&self, query: &str, _k: usize) -> Result<Option<Vec<Document>>, ApiError> {
        let Some(retriever) = &self.0 else {
            return Ok(None);
        };
        retriever.get_relevant_documents(query).await.map(Some)
    }
}

#[async_trait]
impl RetrievalStrategy for HandleRetrieve {
    fn name(&self) -> &'static str {
        "retrieve"
    }

    async fn attempt(&self, query: &str, _k: usize) -> Result<Option<Vec<Document>>, ApiError> {
        let Some(retriever) = &self.0 else {
            return Ok(None);
        };
        retriever.retrieve(query).await.map(Some)
    }
}

#[async_trait]
impl RetrievalStrategy for SimilaritySearch {
    fn name(&self) -> &'static str {
        "similarity_search"
    }

    async fn attempt(&self, query: &str, k: usize) -> Result<Option<Vec<Document>>, ApiError> {
        let Some(index) = &self.0 else {
            return Ok(None);
        };
        index.similarity_search(query, k).await.map(Some)
    }
}

#[async_trait]
impl RetrievalStrategy for ScoredSimilaritySearch {
    fn name(&self) -> &'static str {
        "similarity_search_with_score"
    }

    async fn attempt(&self, query: &str, k: usize) -> Result<Option<Vec<Document>>, ApiError> {
        let Some(index) = &self.0 else {
            return Ok(None);
        };
        let hits = index.similarity_search_with_score(query, k).await?;
        Ok(Some(hits.into_iter().map(|hit| hit.document).collect()))
    }
}

#[async_trait]
impl RetrievalStrategy for KeywordSearch {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn attempt(&self, query: &str, k: usize) -> Result<Option<Vec<Document>>, ApiError> {
        Ok(self.0.as_ref().map(|index| index.keyword_search(query, k)))
    }
}

pub struct Retriever {
    strategies: Vec<Box<dyn RetrievalStrategy>>,
}

impl Retriever {
    /// Standard strategy chain over `index` (which may be missing after a failed build).
    pub fn new(index: Option<Arc<EmbeddingIndex>>, settings: &RetrievalSettings) -> Self {
        let handle = index.as_ref().and_then(|index| {
            match index.as_retriever(settings.retriever_k, settings.similarity_threshold) {
                Ok(handle) => Some(Arc::new(handle)),
                Err(err) => {
                    tracing::warn!("Retriever handle unavailable: {}", err);
                    None
                }
            }
        });

        Self::with_strategies(vec![
            Box::new(RelevantDocuments(handle.clone())),
            Box::new(HandleRetrieve(handle)),
            Box::new(SimilaritySearch(index.clone())),
            Box::new(ScoredSimilaritySearch(index.clone())),
            Box::new(KeywordSearch(index)),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn RetrievalStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn fetch(&self, query: &str, k: usize) -> Vec<Document> {
        for strategy in &self.strategies {
            match strategy.attempt(query, k).await {
                Ok(Some(docs)) if !docs.is_empty() => {
                    tracing::debug!("{} returned {} documents", strategy.name(), docs.len());
                    return docs;
                }
                Ok(Some(_)) => tracing::debug!("{} returned no documents", strategy.name()),
                Ok(None) => tracing::debug!("{} unavailable", strategy.name()),
                Err(err) => tracing::warn!("{} failed: {}", strategy.name(), err),
            }
        }
        Vec::new()
    }
}
