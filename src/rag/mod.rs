//! Retrieval over the incident dataset.
//!
//! - `EmbeddingIndex`: embeds every Document once and answers nearest-neighbour queries
//! - `Retriever`: walks an ordered chain of search strategies and never fails

pub mod index;
pub mod retriever;
pub mod similarity;

pub use index::{EmbeddingIndex, IndexEntry, IndexRetriever, SearchHit};
pub use retriever::{RetrievalStrategy, Retriever};
