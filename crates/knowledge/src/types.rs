//! Knowledge store type definitions.

use chrono::{DateTime, Utc};
use learnpath_core::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of material a document holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[default]
    Documentation,
    Blog,
    Project,
    Tutorial,
    Reference,
}

impl DocumentType {
    pub const ALL: [DocumentType; 5] = [
        DocumentType::Documentation,
        DocumentType::Blog,
        DocumentType::Project,
        DocumentType::Tutorial,
        DocumentType::Reference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Documentation => "documentation",
            DocumentType::Blog => "blog",
            DocumentType::Project => "project",
            DocumentType::Tutorial => "tutorial",
            DocumentType::Reference => "reference",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        DocumentType::ALL
            .into_iter()
            .find(|dt| dt.as_str() == normalized)
            .ok_or_else(|| AppError::Knowledge(format!("Unknown document type: {}", s)))
    }
}

/// A document handed to the store for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeDocument {
    /// Unique identifier; re-adding the same id replaces the record
    pub id: String,

    pub title: String,

    pub content: String,

    /// Where the material came from (URL, book, site name)
    pub source: String,

    #[serde(default)]
    pub document_type: DocumentType,

    /// Free-form metadata; `difficulty` is indexed when it is a string
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl KnowledgeDocument {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        document_type: DocumentType,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            source: source.into(),
            document_type,
            metadata: Map::new(),
        }
    }

    /// Attach one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Text the embedding is computed from.
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }

    /// Difficulty tag from metadata, if present.
    pub fn difficulty(&self) -> Option<&str> {
        self.metadata.get("difficulty").and_then(Value::as_str)
    }

    /// Stored metadata: title, source and document type, overridden by any
    /// same-named key in the document's own metadata.
    pub fn merged_metadata(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        merged.insert("title".to_string(), Value::String(self.title.clone()));
        merged.insert("source".to_string(), Value::String(self.source.clone()));
        merged.insert(
            "document_type".to_string(),
            Value::String(self.document_type.to_string()),
        );
        for (key, value) in &self.metadata {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// A document as persisted in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub source: String,
    /// Kept as text so rows written by other tools still load
    pub document_type: String,
    pub difficulty: Option<String>,
    pub metadata: Map<String, Value>,
    pub updated_at: DateTime<Utc>,
}

/// One ranked hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub content: String,
    pub source: String,
    pub document_type: String,
    /// Similarity in `[0, 1]`
    pub score: f32,
    pub metadata: Map<String, Value>,
}

impl SearchResult {
    pub(crate) fn from_stored(doc: StoredDocument, score: f32) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            content: doc.content,
            source: doc.source,
            document_type: doc.document_type,
            score,
            metadata: doc.metadata,
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeStats {
    pub total_documents: u64,
    pub document_types: BTreeMap<String, u64>,
    pub difficulties: BTreeMap<String, u64>,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub initialized: bool,
}
