//! Filtered similarity ranking.
//!
//! Filters narrow the candidate rows in SQL; ranking, the result cap and the
//! similarity threshold are applied here in that order.

use crate::types::{DocumentType, SearchResult, StoredDocument};
use serde::{Deserialize, Serialize};

/// Optional metadata filters for a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Only documents of this type
    pub document_type: Option<DocumentType>,

    /// Only documents tagged with this difficulty
    pub difficulty: Option<String>,
}

impl SearchFilters {
    /// Create a new empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = Some(document_type);
        self
    }

    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    /// Check if any filters are set
    pub fn has_filters(&self) -> bool {
        self.document_type.is_some() || self.difficulty.is_some()
    }

    /// SQL `WHERE` clause and its positional parameters.
    pub(crate) fn where_clause(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(document_type) = self.document_type {
            params.push(document_type.as_str().to_string());
            conditions.push(format!("document_type = ?{}", params.len()));
        }
        if let Some(difficulty) = &self.difficulty {
            params.push(difficulty.to_lowercase());
            conditions.push(format!("lower(difficulty) = ?{}", params.len()));
        }

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), params)
        }
    }
}

/// Rank candidates against a query embedding.
///
/// Keeps the `limit` most similar candidates, then drops any scoring below
/// `threshold`. The output is ordered by descending score.
pub fn rank(
    query_embedding: &[f32],
    candidates: Vec<(StoredDocument, Vec<f32>)>,
    limit: usize,
    threshold: f32,
) -> Vec<SearchResult> {
    let mut scored: Vec<(StoredDocument, f32)> = candidates
        .into_iter()
        .map(|(doc, embedding)| {
            let distance = cosine_distance(query_embedding, &embedding);
            (doc, similarity_from_distance(distance))
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);

    let before = scored.len();
    let results: Vec<SearchResult> = scored
        .into_iter()
        .filter(|(_, score)| *score >= threshold)
        .map(|(doc, score)| SearchResult::from_stored(doc, score))
        .collect();

    tracing::debug!(
        "Ranked {} candidates, {} above threshold {:.2}",
        before,
        results.len(),
        threshold
    );

    results
}

/// `max(0, 1 - distance)`
pub fn similarity_from_distance(distance: f32) -> f32 {
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Cosine distance `1 - cos(a, b)`; mismatched or zero vectors are maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
