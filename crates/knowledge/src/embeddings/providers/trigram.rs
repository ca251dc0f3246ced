//! Character-trigram embedding provider.

use crate::embeddings::provider::EmbeddingProvider;
use learnpath_core::{AppError, AppResult};
use std::collections::{HashMap, HashSet};

const STOP_WORDS: [&str; 33] = [
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "how",
];

/// Deterministic, offline embeddings from character trigrams and word hashes.
///
/// Not semantic in the neural sense, but content-dependent and stable across
/// runs, which is all the store needs to rank lexically related documents.
#[derive(Debug, Clone)]
pub struct TrigramProvider {
    model: String,
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self::with_model("trigram-v1", dimensions)
    }

    pub fn with_model(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
        }
    }
}

/// Unit-length trigram embedding; empty or stop-word-only text maps to zeros.
pub fn trigram_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let mut embedding = vec![0.0f32; dimensions];
    if dimensions == 0 {
        return embedding;
    }

    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let lower = text.to_lowercase();

    let mut word_freq: HashMap<&str, u32> = HashMap::new();
    for word in lower
        .split(|c: char| !c.is_alphanumeric() && c != '-' && c != '+' && c != '#')
        .filter(|w| w.chars().count() > 2 && !stop_words.contains(w))
    {
        *word_freq.entry(word).or_insert(0) += 1;
    }

    for (word, freq) in &word_freq {
        let chars: Vec<char> = word.chars().collect();
        for window in chars.windows(3) {
            let trigram_hash = window
                .iter()
                .fold(0u64, |acc, c| acc.wrapping_mul(37).wrapping_add(*c as u64));
            let dim_idx = (trigram_hash % dimensions as u64) as usize;
            embedding[dim_idx] += (*freq as f32).sqrt();
        }

        let word_hash = word
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let base_dim = (word_hash % dimensions as u64) as usize;
        embedding[base_dim] += *freq as f32;
    }

    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut embedding {
            *v /= norm;
        }
    }

    embedding
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let texts = texts.to_vec();
        let dimensions = self.dimensions;

        // Hashing a batch is CPU-bound; keep it off the async workers
        tokio::task::spawn_blocking(move || {
            texts
                .iter()
                .map(|text| trigram_embedding(text, dimensions))
                .collect()
        })
        .await
        .map_err(|e| AppError::Knowledge(format!("Embedding task failed: {}", e)))
    }
}
