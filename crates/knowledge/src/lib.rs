//! Knowledge store for learning material.
//!
//! Documents are embedded, persisted in SQLite together with their vectors
//! and retrieved by cosine similarity with optional metadata filters.

pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod search;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingProvider, OllamaEmbeddingProvider, TrigramProvider};
pub use ingest::load_documents;
pub use search::SearchFilters;
pub use store::{KnowledgeStore, StoreSettings, BATCH_CHUNK_SIZE};
pub use types::{DocumentType, KnowledgeDocument, KnowledgeStats, SearchResult, StoredDocument};
