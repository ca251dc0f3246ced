//! Store behavior against a real SQLite file.

use crate::embeddings::{EmbeddingProvider, TrigramProvider};
use crate::search::SearchFilters;
use crate::store::{KnowledgeStore, StoreSettings, BATCH_CHUNK_SIZE};
use crate::types::{DocumentType, KnowledgeDocument};
use learnpath_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Trigram embeddings, except any batch containing `POISON` fails.
#[derive(Debug)]
struct PoisonAwareProvider {
    inner: TrigramProvider,
}

#[async_trait::async_trait]
impl EmbeddingProvider for PoisonAwareProvider {
    fn provider_name(&self) -> &str {
        "poison-aware"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains("POISON")) {
            return Err(AppError::Knowledge("refusing poisoned batch".to_string()));
        }
        self.inner.embed_batch(texts).await
    }
}

fn settings(dir: &Path, max_results: usize, threshold: f32) -> StoreSettings {
    StoreSettings {
        persist_directory: dir.to_path_buf(),
        max_results,
        similarity_threshold: threshold,
    }
}

fn store(dir: &Path, max_results: usize, threshold: f32) -> KnowledgeStore {
    KnowledgeStore::new(
        Arc::new(TrigramProvider::new(384)),
        settings(dir, max_results, threshold),
    )
}

fn doc(id: &str, title: &str, content: &str) -> KnowledgeDocument {
    KnowledgeDocument::new(id, title, content, "test-suite", DocumentType::Documentation)
}

fn rust_docs(count: usize) -> Vec<KnowledgeDocument> {
    (0..count)
        .map(|i| {
            doc(
                &format!("rust-{}", i),
                &format!("Rust ownership lesson {}", i),
                "Ownership, borrowing and lifetimes in Rust programs",
            )
        })
        .collect()
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = store(dir.path(), 5, 0.0);

    assert!(!store.is_initialized());
    store.initialize().await.unwrap();
    store.initialize().await.unwrap();
    assert!(store.is_initialized());
    assert!(dir.path().join(crate::index::DATABASE_FILE).exists());
}

#[tokio::test]
async fn test_operations_initialize_lazily() {
    let dir = TempDir::new().unwrap();
    let store = store(dir.path(), 5, 0.0);

    assert!(store.add_document(doc("a", "CSS Flexbox", "Flexible box layout")).await);
    assert!(store.is_initialized());
}

#[tokio::test]
async fn test_initialize_failure_is_store_init() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file in the way").unwrap();

    let store = store(&blocker.join("store"), 5, 0.0);
    assert!(matches!(store.initialize().await, Err(AppError::StoreInit(_))));
    assert!(!store.add_document(doc("a", "t", "c")).await);
    assert!(store.search("anything", 5, None).await.is_empty());
}

#[tokio::test]
async fn test_search_finds_relevant_document_first() {
    let dir = TempDir::new().unwrap();
    let store = store(dir.path(), 5, 0.0);

    store.add_document(doc("react", "React hooks tutorial", "useState and useEffect hooks in React components")).await;
    store.add_document(doc("sql", "PostgreSQL vacuum", "Index maintenance and vacuum tuning for PostgreSQL")).await;

    let results = store.search("react hooks", 5, None).await;
    assert!(!results.is_empty());
    assert_eq!(results[0].id, "react");
    assert_eq!(results[0].metadata["title"], "React hooks tutorial");
}

#[tokio::test]
async fn test_search_never_returns_results_below_threshold() {
    let dir = TempDir::new().unwrap();
    let store = store(dir.path(), 10, 0.6);

    store.add_document(doc("react", "React hooks tutorial", "useState and useEffect hooks")).await;
    store.add_document(doc("sql", "PostgreSQL vacuum", "Index maintenance and vacuum tuning")).await;
    store.add_document(doc("css", "CSS grid", "Two-dimensional layout with grid areas")).await;

    for query in ["react hooks tutorial", "database tuning", "completely unrelated words"] {
        let results = store.search(query, 10, None).await;
        assert!(results.iter().all(|r| r.score >= 0.6), "query {:?}", query);
    }
}

#[tokio::test]
async fn test_search_caps_results_at_min_of_top_k_and_max() {
    let dir = TempDir::new().unwrap();
    let store = store(dir.path(), 5, 0.0);
    assert_eq!(store.add_documents_batch(rust_docs(10)).await, 10);

    assert_eq!(store.search("rust ownership", 10, None).await.len(), 5);
    assert_eq!(store.search("rust ownership", 2, None).await.len(), 2);
    assert!(store.search("rust ownership", 0, None).await.is_empty());
}

#[tokio::test]
async fn test_results_are_sorted_by_score() {
    let dir = TempDir::new().unwrap();
    let store = store(dir.path(), 10, 0.0);
    store.add_documents_batch(rust_docs(4)).await;
    store.add_document(doc("go", "Go channels", "Goroutines communicate over channels")).await;

    let results = store.search("rust borrowing", 10, None).await;
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_search_applies_filters() {
    let dir = TempDir::new().unwrap();
    let store = store(dir.path(), 10, 0.0);

    let tutorial = KnowledgeDocument::new("t", "JavaScript promises", "async and await", "mdn", DocumentType::Tutorial)
        .with_metadata("difficulty", "Intermediate");
    let reference = KnowledgeDocument::new("r", "JavaScript promises API", "Promise.all and friends", "mdn", DocumentType::Reference)
        .with_metadata("difficulty", "advanced");
    store.add_documents_batch(vec![tutorial, reference]).await;

    let by_type = SearchFilters::new().with_document_type(DocumentType::Reference);
    let results = store.search("javascript promises", 10, Some(&by_type)).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "r");

    let by_difficulty = SearchFilters::new().with_difficulty("intermediate");
    let results = store.search("javascript promises", 10, Some(&by_difficulty)).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "t");
}

#[tokio::test]
async fn test_readding_id_replaces_document() {
    let dir = TempDir::new().unwrap();
    let store = store(dir.path(), 5, 0.0);

    assert!(store.add_document(doc("a", "Old title", "old content")).await);
    assert!(store.add_document(doc("a", "New title", "new content")).await);

    let stats = store.get_stats().await.unwrap();
    assert_eq!(stats.total_documents, 1);

    let stored = store.get_document("a").await.unwrap().unwrap();
    assert_eq!(stored.title, "New title");
    assert_eq!(stored.content, "new content");
}

#[tokio::test]
async fn test_batch_counts_only_committed_chunks() {
    let dir = TempDir::new().unwrap();
    let store = KnowledgeStore::new(
        Arc::new(PoisonAwareProvider {
            inner: TrigramProvider::new(384),
        }),
        settings(dir.path(), 5, 0.0),
    );

    let mut docs = rust_docs(BATCH_CHUNK_SIZE + 4);
    docs[3].content = "POISON".to_string();

    let added = store.add_documents_batch(docs).await;
    assert_eq!(added, 4);
    assert_eq!(store.get_stats().await.unwrap().total_documents, 4);

    // Nothing from the failed chunk was written
    assert!(store.get_document("rust-0").await.unwrap().is_none());
    assert!(store.get_document(&format!("rust-{}", BATCH_CHUNK_SIZE)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_empty_batch_adds_nothing() {
    let dir = TempDir::new().unwrap();
    let store = store(dir.path(), 5, 0.0);
    assert_eq!(store.add_documents_batch(Vec::new()).await, 0);
}

#[tokio::test]
async fn test_reopening_with_different_model_is_refused() {
    let dir = TempDir::new().unwrap();
    {
        let store = store(dir.path(), 5, 0.0);
        store.add_document(doc("a", "t", "c")).await;
    }

    let other = KnowledgeStore::new(
        Arc::new(TrigramProvider::with_model("trigram-v2", 384)),
        settings(dir.path(), 5, 0.0),
    );
    assert!(matches!(other.initialize().await, Err(AppError::StoreInit(_))));

    let same = store(dir.path(), 5, 0.0);
    same.initialize().await.unwrap();
    assert_eq!(same.get_stats().await.unwrap().total_documents, 1);
}

#[tokio::test]
async fn test_stats_delete_and_reset() {
    let dir = TempDir::new().unwrap();
    let store = store(dir.path(), 5, 0.0);

    let docs = vec![
        KnowledgeDocument::new("1", "HTML", "Markup", "mdn", DocumentType::Reference)
            .with_metadata("difficulty", "beginner"),
        KnowledgeDocument::new("2", "Todo app", "Build a todo list", "fcc", DocumentType::Project)
            .with_metadata("difficulty", "beginner"),
        KnowledgeDocument::new("3", "Web perf", "Core web vitals", "blog", DocumentType::Blog),
    ];
    assert_eq!(store.add_documents_batch(docs).await, 3);

    let stats = store.get_stats().await.unwrap();
    assert_eq!(stats.total_documents, 3);
    assert_eq!(stats.document_types["project"], 1);
    assert_eq!(stats.difficulties["beginner"], 2);
    assert_eq!(stats.embedding_model, "trigram-v1");
    assert!(stats.initialized);

    assert!(store.delete_document("2").await.unwrap());
    assert!(!store.delete_document("2").await.unwrap());
    assert_eq!(store.get_stats().await.unwrap().total_documents, 2);

    assert!(store.reset().await);
    assert_eq!(store.get_stats().await.unwrap().total_documents, 0);
    assert!(store.search("HTML", 5, None).await.is_empty());
}
