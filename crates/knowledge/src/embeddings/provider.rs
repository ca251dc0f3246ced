//! Embedding provider trait and factory.

use super::providers::{ollama::OllamaEmbeddingProvider, trigram::TrigramProvider};
use learnpath_core::{AppError, AppResult, KnowledgeSettings};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Implementations must be deterministic per model: the same text always
/// maps to the same vector, and every vector has `dimensions()` entries.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier; stamps the collection
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(settings: &KnowledgeSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.embedding_provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::with_model(
            &settings.embedding_model,
            settings.embedding_dimensions,
        ))),

        "ollama" => {
            let provider = OllamaEmbeddingProvider::new(
                settings.embedding_endpoint.as_deref(),
                &settings.embedding_model,
                settings.embedding_dimensions,
            )?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::StoreInit(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama",
            settings.embedding_provider
        ))),
    }
}
