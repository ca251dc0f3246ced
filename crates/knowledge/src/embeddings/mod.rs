//! Embedding functions for the knowledge store.
//!
//! One provider is chosen per store; its model name and dimensions stamp the
//! collection at initialization.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{OllamaEmbeddingProvider, TrigramProvider};
