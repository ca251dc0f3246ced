//! The knowledge store: embedding, persistence and similarity search.
//!
//! Initialization is idempotent and lazy: every operation opens the store on
//! first use. Only initialization failures are hard errors. Per-document and
//! per-search failures degrade to `false` / empty results.

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::index;
use crate::search::{rank, SearchFilters};
use crate::types::{KnowledgeDocument, KnowledgeStats, SearchResult, StoredDocument};
use learnpath_core::{AppConfig, AppError, AppResult};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;

/// Documents embedded and written per transaction.
pub const BATCH_CHUNK_SIZE: usize = 16;

/// Settings the store needs from the application config.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// Directory holding the SQLite file
    pub persist_directory: PathBuf,

    /// Global cap on search results
    pub max_results: usize,

    /// Minimum similarity for a result to be returned
    pub similarity_threshold: f32,
}

impl StoreSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            persist_directory: config.persist_directory(),
            max_results: config.rag.max_retrieval_results,
            similarity_threshold: config.rag.similarity_threshold,
        }
    }

    fn database_path(&self) -> PathBuf {
        self.persist_directory.join(index::DATABASE_FILE)
    }
}

type SharedConnection = Arc<Mutex<Connection>>;

/// Vector-search knowledge store backed by SQLite.
pub struct KnowledgeStore {
    settings: StoreSettings,
    provider: Arc<dyn EmbeddingProvider>,
    connection: OnceCell<SharedConnection>,
}

impl KnowledgeStore {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, settings: StoreSettings) -> Self {
        Self {
            settings,
            provider,
            connection: OnceCell::new(),
        }
    }

    /// Build a store from configuration. An unknown embedding provider is a
    /// `StoreInit` error.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let provider = create_provider(&config.knowledge)?;
        Ok(Self::new(provider, StoreSettings::from_config(config)))
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn is_initialized(&self) -> bool {
        self.connection.initialized()
    }

    /// Open the collection and load the embedding function.
    ///
    /// Safe to call repeatedly and concurrently; only the first successful
    /// call does any work. A failed attempt can be retried.
    pub async fn initialize(&self) -> AppResult<()> {
        self.connection().await.map(|_| ())
    }

    async fn connection(&self) -> AppResult<&SharedConnection> {
        self.connection
            .get_or_try_init(|| async {
                let started = std::time::Instant::now();

                // Probe the embedding function before touching the collection
                let probe = self
                    .provider
                    .embed("knowledge store initialization")
                    .await
                    .map_err(|e| {
                        AppError::StoreInit(format!(
                            "Embedding provider {} failed to load: {}",
                            self.provider.provider_name(),
                            e
                        ))
                    })?;
                if probe.len() != self.provider.dimensions() {
                    return Err(AppError::StoreInit(format!(
                        "Embedding provider returned {} dimensions, expected {}",
                        probe.len(),
                        self.provider.dimensions()
                    )));
                }

                let path = self.settings.database_path();
                let model = self.provider.model_name().to_string();
                let dimensions = self.provider.dimensions();

                let conn = blocking(move || {
                    let conn = index::init_index(&path)?;
                    index::ensure_embedding_stamp(&conn, &model, dimensions)?;
                    Ok(conn)
                })
                .await
                .map_err(|e| match e {
                    AppError::StoreInit(_) => e,
                    other => AppError::StoreInit(other.to_string()),
                })?;

                tracing::info!(
                    "Knowledge store ready at {:?} ({} / {} dims) in {:?}",
                    self.settings.persist_directory,
                    self.provider.model_name(),
                    self.provider.dimensions(),
                    started.elapsed()
                );
                Ok::<_, AppError>(Arc::new(Mutex::new(conn)))
            })
            .await
    }

    /// Embed and upsert one document.
    ///
    /// Returns `false` on any failure, including a store that cannot be
    /// opened; the cause is logged.
    pub async fn add_document(&self, document: KnowledgeDocument) -> bool {
        match self.persist_chunk(vec![document]).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Error adding document: {}", e);
                false
            }
        }
    }

    /// Embed and upsert documents in chunks of [`BATCH_CHUNK_SIZE`].
    ///
    /// Each chunk commits or fails on its own; the return value counts the
    /// documents in committed chunks.
    pub async fn add_documents_batch(&self, documents: Vec<KnowledgeDocument>) -> usize {
        let total = documents.len();
        let mut added = 0;

        let mut remaining = documents.into_iter().peekable();
        let mut chunk_index = 0;
        while remaining.peek().is_some() {
            let chunk: Vec<KnowledgeDocument> = remaining.by_ref().take(BATCH_CHUNK_SIZE).collect();
            let size = chunk.len();

            match self.persist_chunk(chunk).await {
                Ok(written) => added += written,
                Err(e) => {
                    tracing::error!("Batch chunk {} ({} documents) failed: {}", chunk_index, size, e)
                }
            }
            chunk_index += 1;
        }

        tracing::info!("Added {}/{} documents in batch", added, total);
        added
    }

    async fn persist_chunk(&self, documents: Vec<KnowledgeDocument>) -> AppResult<usize> {
        let conn = self.connection().await?.clone();

        let texts: Vec<String> = documents.iter().map(KnowledgeDocument::embedding_text).collect();
        let embeddings = self
            .provider
            .embed_batch(&texts)
            .await
            .map_err(|e| AppError::DocumentPersist(format!("Embedding failed: {}", e)))?;

        if embeddings.len() != documents.len() {
            return Err(AppError::DocumentPersist(format!(
                "Embedding provider returned {} vectors for {} documents",
                embeddings.len(),
                documents.len()
            )));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.provider.dimensions()) {
            return Err(AppError::DocumentPersist(format!(
                "Embedding has {} dimensions, store expects {}",
                bad.len(),
                self.provider.dimensions()
            )));
        }

        let rows: Vec<(KnowledgeDocument, Vec<f32>)> = documents.into_iter().zip(embeddings).collect();
        blocking(move || {
            let mut guard = lock(&conn)?;
            index::upsert_documents(&mut guard, &rows)
        })
        .await
    }

    /// Nearest-neighbour search.
    ///
    /// At most `min(top_k, max_results)` results, each scoring at least the
    /// similarity threshold, best first. Errors are logged and yield an empty
    /// list.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&SearchFilters>,
    ) -> Vec<SearchResult> {
        match self.try_search(query, top_k, filters).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!("Search error: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_search(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&SearchFilters>,
    ) -> AppResult<Vec<SearchResult>> {
        let limit = top_k.min(self.settings.max_results);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.connection().await?.clone();
        let query_embedding = self
            .provider
            .embed(query)
            .await
            .map_err(|e| AppError::Search(format!("Failed to embed query: {}", e)))?;

        let filters = filters.cloned().unwrap_or_default();
        let threshold = self.settings.similarity_threshold;

        let results = blocking(move || {
            let candidates = {
                let guard = lock(&conn)?;
                index::load_candidates(&guard, &filters)?
            };
            Ok(rank(&query_embedding, candidates, limit, threshold))
        })
        .await?;

        tracing::debug!(
            "Search returned {} results (limit {}, threshold {:.2})",
            results.len(),
            limit,
            threshold
        );
        Ok(results)
    }

    /// Fetch one stored document.
    pub async fn get_document(&self, id: &str) -> AppResult<Option<StoredDocument>> {
        let conn = self.connection().await?.clone();
        let id = id.to_string();
        blocking(move || index::get_document(&*lock(&conn)?, &id)).await
    }

    /// Delete one document; `Ok(false)` when the id was unknown.
    pub async fn delete_document(&self, id: &str) -> AppResult<bool> {
        let conn = self.connection().await?.clone();
        let id = id.to_string();
        let deleted = blocking(move || index::delete_document(&*lock(&conn)?, &id)).await?;
        if deleted {
            tracing::info!("Deleted document");
        }
        Ok(deleted)
    }

    /// Document counts plus per-type and per-difficulty breakdowns.
    pub async fn get_stats(&self) -> AppResult<KnowledgeStats> {
        let conn = self.connection().await?.clone();
        let (total, by_type, by_difficulty) =
            blocking(move || index::get_stats(&*lock(&conn)?)).await?;

        Ok(KnowledgeStats {
            total_documents: total,
            document_types: by_type,
            difficulties: by_difficulty,
            embedding_model: self.provider.model_name().to_string(),
            embedding_dimensions: self.provider.dimensions(),
            initialized: self.is_initialized(),
        })
    }

    /// Destructively clear the collection. Maintenance only.
    pub async fn reset(&self) -> bool {
        let result: AppResult<()> = async {
            let conn = self.connection().await?.clone();
            let model = self.provider.model_name().to_string();
            let dimensions = self.provider.dimensions();
            blocking(move || index::reset_index(&*lock(&conn)?, &model, dimensions)).await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Reset error: {}", e);
                false
            }
        }
    }
}

/// Run blocking SQLite work on the blocking pool.
async fn blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Knowledge(format!("Store task failed: {}", e)))?
}

fn lock(conn: &Mutex<Connection>) -> AppResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| AppError::Knowledge("Store connection lock poisoned".to_string()))
}
