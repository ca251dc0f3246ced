//! SQLite persistence for the knowledge store.
//!
//! Every function here is blocking; the store calls them from
//! `spawn_blocking`.

use crate::search::SearchFilters;
use crate::types::{KnowledgeDocument, StoredDocument};
use chrono::{DateTime, Utc};
use learnpath_core::{AppError, AppResult};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// File name of the database inside the persistence directory.
pub const DATABASE_FILE: &str = "knowledge.sqlite";

const META_EMBEDDING_MODEL: &str = "embedding_model";
const META_EMBEDDING_DIMENSIONS: &str = "embedding_dimensions";

const DOCUMENT_COLUMNS: &str =
    "id, title, content, source, document_type, difficulty, metadata, updated_at";

/// Open (or create) the database and its tables.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::StoreInit(format!("Failed to create store directory {:?}: {}", parent, e))
        })?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::StoreInit(format!("Failed to open SQLite store: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            source TEXT NOT NULL,
            document_type TEXT NOT NULL,
            difficulty TEXT,
            metadata TEXT NOT NULL,
            embedding BLOB NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_type ON documents(document_type);
        CREATE INDEX IF NOT EXISTS idx_documents_difficulty ON documents(difficulty);

        CREATE TABLE IF NOT EXISTS store_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| AppError::StoreInit(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite store at {:?}", db_path);
    Ok(conn)
}

/// Stamp the collection with the embedding model, or verify an existing stamp.
///
/// Vectors from different models are not comparable, so reopening a store
/// with another model or dimension count is refused.
pub fn ensure_embedding_stamp(conn: &Connection, model: &str, dimensions: usize) -> AppResult<()> {
    let stored_model = read_meta(conn, META_EMBEDDING_MODEL)?;
    let stored_dimensions = read_meta(conn, META_EMBEDDING_DIMENSIONS)?;

    match (stored_model, stored_dimensions) {
        (Some(stored_model), Some(stored_dimensions)) => {
            if stored_model != model || stored_dimensions != dimensions.to_string() {
                return Err(AppError::StoreInit(format!(
                    "Store was built with embedding model {} ({} dims) but {} ({} dims) is configured; reset the store to switch models",
                    stored_model, stored_dimensions, model, dimensions
                )));
            }
            Ok(())
        }
        _ => write_embedding_stamp(conn, model, dimensions),
    }
}

fn write_embedding_stamp(conn: &Connection, model: &str, dimensions: usize) -> AppResult<()> {
    for (key, value) in [
        (META_EMBEDDING_MODEL, model.to_string()),
        (META_EMBEDDING_DIMENSIONS, dimensions.to_string()),
    ] {
        conn.execute(
            "INSERT OR REPLACE INTO store_meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| AppError::StoreInit(format!("Failed to write store metadata: {}", e)))?;
    }
    Ok(())
}

fn read_meta(conn: &Connection, key: &str) -> AppResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM store_meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| AppError::StoreInit(format!("Failed to read store metadata: {}", e)))
}

/// Upsert documents with their embeddings in one transaction.
///
/// Either every row is written or none is.
pub fn upsert_documents(
    conn: &mut Connection,
    rows: &[(KnowledgeDocument, Vec<f32>)],
) -> AppResult<usize> {
    let tx = conn
        .transaction()
        .map_err(|e| AppError::DocumentPersist(format!("Failed to begin transaction: {}", e)))?;

    {
        let mut stmt = tx
            .prepare(
                "INSERT OR REPLACE INTO documents
                 (id, title, content, source, document_type, difficulty, metadata, embedding, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .map_err(|e| AppError::DocumentPersist(format!("Failed to prepare insert: {}", e)))?;

        let now = Utc::now().to_rfc3339();
        for (doc, embedding) in rows {
            let metadata = serde_json::to_string(&doc.merged_metadata()).map_err(|e| {
                AppError::DocumentPersist(format!("Failed to serialize metadata for {}: {}", doc.id, e))
            })?;

            stmt.execute(params![
                doc.id,
                doc.title,
                doc.content,
                doc.source,
                doc.document_type.as_str(),
                doc.difficulty(),
                metadata,
                embedding_to_bytes(embedding),
                now,
            ])
            .map_err(|e| {
                AppError::DocumentPersist(format!("Failed to insert document {}: {}", doc.id, e))
            })?;
        }
    }

    tx.commit()
        .map_err(|e| AppError::DocumentPersist(format!("Failed to commit documents: {}", e)))?;

    Ok(rows.len())
}

/// Load every document matching the filters together with its embedding.
pub fn load_candidates(
    conn: &Connection,
    filters: &SearchFilters,
) -> AppResult<Vec<(StoredDocument, Vec<f32>)>> {
    let (clause, values) = filters.where_clause();
    let sql = format!("SELECT {}, embedding FROM documents{}", DOCUMENT_COLUMNS, clause);

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| AppError::Search(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            let doc = row_to_document(row)?;
            let bytes: Vec<u8> = row.get(8)?;
            Ok((doc, bytes))
        })
        .map_err(|e| AppError::Search(format!("Failed to query documents: {}", e)))?;

    let mut candidates = Vec::new();
    for row in rows {
        let (doc, bytes) =
            row.map_err(|e| AppError::Search(format!("Failed to read document row: {}", e)))?;
        match bytes_to_embedding(&bytes) {
            Ok(embedding) => candidates.push((doc, embedding)),
            Err(e) => tracing::warn!("Skipping document {} with corrupt embedding: {}", doc.id, e),
        }
    }

    Ok(candidates)
}

/// Fetch a single document by id.
pub fn get_document(conn: &Connection, id: &str) -> AppResult<Option<StoredDocument>> {
    conn.query_row(
        &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
        params![id],
        row_to_document,
    )
    .optional()
    .map_err(|e| AppError::Knowledge(format!("Failed to load document {}: {}", id, e)))
}

/// Delete a document; returns whether a row existed.
pub fn delete_document(conn: &Connection, id: &str) -> AppResult<bool> {
    let affected = conn
        .execute("DELETE FROM documents WHERE id = ?1", params![id])
        .map_err(|e| AppError::Knowledge(format!("Failed to delete document {}: {}", id, e)))?;
    Ok(affected > 0)
}

/// Total count plus per-type and per-difficulty breakdowns.
pub fn get_stats(
    conn: &Connection,
) -> AppResult<(u64, BTreeMap<String, u64>, BTreeMap<String, u64>)> {
    let total: i64 = conn
        .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
        .map_err(|e| AppError::Knowledge(format!("Failed to count documents: {}", e)))?;

    let by_type = group_counts(conn, "document_type")?;
    let by_difficulty = group_counts(conn, "difficulty")?;

    Ok((total.max(0) as u64, by_type, by_difficulty))
}

fn group_counts(conn: &Connection, column: &str) -> AppResult<BTreeMap<String, u64>> {
    let sql = format!(
        "SELECT {col}, COUNT(*) FROM documents WHERE {col} IS NOT NULL GROUP BY {col}",
        col = column
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare stats query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(|e| AppError::Knowledge(format!("Failed to compute stats: {}", e)))?;

    let mut counts = BTreeMap::new();
    for row in rows {
        let (key, count) =
            row.map_err(|e| AppError::Knowledge(format!("Failed to read stats row: {}", e)))?;
        counts.insert(key, count.max(0) as u64);
    }
    Ok(counts)
}

/// Delete every document and re-stamp the collection.
pub fn reset_index(conn: &Connection, model: &str, dimensions: usize) -> AppResult<()> {
    conn.execute("DELETE FROM documents", [])
        .map_err(|e| AppError::Knowledge(format!("Failed to delete documents: {}", e)))?;
    conn.execute("DELETE FROM store_meta", [])
        .map_err(|e| AppError::Knowledge(format!("Failed to clear store metadata: {}", e)))?;
    write_embedding_stamp(conn, model, dimensions)
        .map_err(|e| AppError::Knowledge(e.to_string()))?;

    tracing::info!("Reset knowledge store");
    Ok(())
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<StoredDocument> {
    let metadata_json: String = row.get(6)?;
    let metadata: Map<String, Value> = serde_json::from_str(&metadata_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e)))?;

    let updated_at: String = row.get(7)?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(StoredDocument {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        source: row.get(3)?,
        document_type: row.get(4)?,
        difficulty: row.get(5)?,
        metadata,
        updated_at,
    })
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
