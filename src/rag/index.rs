//! In-memory embedding index over the dataset Documents.
//!
//! Vectors are computed once at build time; searches embed the query with the
//! same model and scan all entries by cosine similarity.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;

use super::similarity::{cosine_similarity, keyword_score, query_terms};
use crate::core::errors::ApiError;
use crate::dataset::Document;
use crate::llm::LlmProvider;

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub document_id: usize,
    pub vector: Vec<f32>,
    pub document: Document,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document: Document,
    /// Higher is nearer.
    pub score: f32,
}

pub struct EmbeddingIndex {
    provider: Arc<dyn LlmProvider>,
    model: String,
    entries: Vec<IndexEntry>,
    dimension: usize,
}

impl EmbeddingIndex {
    /// Embeds every document in batches of `batch_size`.
    ///
    /// Fails if the backend errors, returns the wrong number of vectors, or
    /// returns vectors of differing dimension.
    pub async fn build(
        provider: Arc<dyn LlmProvider>,
        model: &str,
        documents: Vec<Document>,
        batch_size: usize,
    ) -> Result<Self, ApiError> {
        let batch_size = batch_size.max(1);
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(documents.len());

        for batch in documents.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|doc| doc.text.clone()).collect();
            let embedded = provider.embed(&texts, model).await?;
            if embedded.len() != texts.len() {
                return Err(ApiError::Internal(format!(
                    "Embedding backend returned {} vectors for {} documents",
                    embedded.len(),
                    texts.len()
                )));
            }
            vectors.extend(embedded);
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if vectors.iter().any(|v| v.is_empty() || v.len() != dimension) {
            return Err(ApiError::Internal(
                "Embedding backend returned empty or inconsistent vectors".to_string(),
            ));
        }

        let entries: Vec<IndexEntry> = documents
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(document_id, (document, vector))| IndexEntry {
                document_id,
                vector,
                document,
            })
            .collect();

        tracing::info!(
            "Built embedding index: {} documents, dimension {}, model {}",
            entries.len(),
            dimension,
            model
        );

        Ok(Self {
            provider,
            model: model.to_string(),
            entries,
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Same entries, different backend for query embeddings.
    #[cfg(test)]
    pub(crate) fn rebind(&self, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: self.model.clone(),
            entries: self.entries.clone(),
            dimension: self.dimension,
        }
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.provider.embed(&[query.to_string()], &self.model).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| ApiError::Internal("No embedding returned for query".to_string()))?;
        if vector.len() != self.dimension {
            return Err(ApiError::Internal(format!(
                "Query embedding has dimension {}, index has {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(vector)
    }

    /// Nearest `k` entries to `vector`, best first. Ties keep dataset order.
    pub fn search_by_vector(&self, vector: &[f32], k: usize) -> Vec<SearchHit> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, cosine_similarity(vector, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(pos, score)| SearchHit {
                document: self.entries[pos].document.clone(),
                score,
            })
            .collect()
    }

    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, ApiError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embed_query(query).await?;
        Ok(self.search_by_vector(&vector, k))
    }

    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>, ApiError> {
        Ok(self
            .similarity_search_with_score(query, k)
            .await?
            .into_iter()
            .map(|hit| hit.document)
            .collect())
    }

    /// Term-overlap ranking that needs no embedding backend.
    pub fn keyword_search(&self, query: &str, k: usize) -> Vec<Document> {
        let terms = query_terms(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, keyword_score(&terms, &entry.document.text)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        scored
            .into_iter()
            .map(|(pos, _)| self.entries[pos].document.clone())
            .collect()
    }

    pub fn as_retriever(
        self: &Arc<Self>,
        k: usize,
        score_threshold: Option<f32>,
    ) -> Result<IndexRetriever, ApiError> {
        if k == 0 {
            return Err(ApiError::BadRequest("retriever k must be at least 1".to_string()));
        }
        Ok(IndexRetriever {
            index: Arc::clone(self),
            k,
            score_threshold,
        })
    }
}

/// Retriever handle with its own `k` and optional score cut-off.
pub struct IndexRetriever {
    index: Arc<EmbeddingIndex>,
    k: usize,
    score_threshold: Option<f32>,
}

impl IndexRetriever {
    pub fn k(&self) -> usize {
        self.k
    }

    pub async fn get_relevant_documents(&self, query: &str) -> Result<Vec<Document>, ApiError> {
        let hits = self.index.similarity_search_with_score(query, self.k).await?;
        Ok(hits
            .into_iter()
            .filter(|hit| self.score_threshold.map_or(true, |min| hit.score >= min))
            .map(|hit| hit.document)
            .collect())
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>, ApiError> {
        self.index.similarity_search(query, self.k).await
    }
}
