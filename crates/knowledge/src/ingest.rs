//! Loading knowledge documents from disk.
//!
//! Accepts a JSON array of documents or JSON Lines (one document per line).
//! Only `title` and `content` are required; the rest is filled in.

use crate::types::{DocumentType, KnowledgeDocument};
use learnpath_core::{AppError, AppResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
struct RawDocument {
    id: Option<String>,
    title: String,
    content: String,
    source: Option<String>,
    #[serde(alias = "type")]
    document_type: Option<String>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

/// Read documents from a `.json` or `.jsonl` file.
pub fn load_documents(path: &Path) -> AppResult<Vec<KnowledgeDocument>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    let default_source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string());

    let raw = parse_documents(&text)
        .map_err(|e| AppError::Knowledge(format!("Failed to parse {:?}: {}", path, e)))?;

    let documents = raw
        .into_iter()
        .map(|doc| into_document(doc, &default_source))
        .collect::<AppResult<Vec<_>>>()?;

    tracing::info!("Loaded {} documents from {:?}", documents.len(), path);
    Ok(documents)
}

fn parse_documents(text: &str) -> Result<Vec<RawDocument>, serde_json::Error> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed);
    }

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str)
        .collect()
}

fn into_document(raw: RawDocument, default_source: &str) -> AppResult<KnowledgeDocument> {
    let document_type = match raw.document_type.as_deref() {
        Some(value) if !value.trim().is_empty() => DocumentType::from_str(value)?,
        _ => DocumentType::default(),
    };

    let id = raw
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let source = raw
        .source
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default_source.to_string());

    let mut document = KnowledgeDocument::new(id, raw.title, raw.content, source, document_type);
    document.metadata = raw.metadata;
    Ok(document)
}
