//! Generation client doubles and store helpers.

use crate::orchestrator::{Orchestrator, OrchestratorSettings};
use learnpath_core::{AppError, AppResult};
use learnpath_knowledge::{KnowledgeStore, StoreSettings, TrigramProvider};
use learnpath_llm::GenerationClient;
use learnpath_prompt::PromptLibrary;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Replies with queued texts in order; an empty queue is a provider failure.
pub struct ScriptedGenerator {
    replies: Mutex<Vec<String>>,
    probe_ok: bool,
    pub calls: AtomicUsize,
    pub systems: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            probe_ok: true,
            calls: AtomicUsize::new(0),
            systems: Mutex::new(Vec::new()),
        }
    }

    /// Passes the probe, then fails every call.
    pub fn failing() -> Self {
        Self::new(&[])
    }

    pub fn unreachable() -> Self {
        Self {
            probe_ok: false,
            ..Self::new(&[])
        }
    }
}

#[async_trait::async_trait]
impl GenerationClient for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn generate_text(
        &self,
        _prompt: &str,
        system_instruction: Option<&str>,
        _context: Option<&str>,
    ) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(system) = system_instruction {
            self.systems.lock().unwrap().push(system.to_string());
        }
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| AppError::ProviderUnavailable("quota exhausted".to_string()))
    }

    async fn test_connection(&self) -> bool {
        self.probe_ok
    }
}

pub fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        max_retrieval_results: 5,
        max_context_length: 8000,
    }
}

pub fn store(dir: &Path) -> Arc<KnowledgeStore> {
    Arc::new(KnowledgeStore::new(
        Arc::new(TrigramProvider::new(384)),
        StoreSettings {
            persist_directory: dir.to_path_buf(),
            max_results: 5,
            similarity_threshold: 0.1,
        },
    ))
}

pub fn orchestrator(dir: &Path, generator: Arc<dyn GenerationClient>) -> Orchestrator {
    Orchestrator::new(store(dir), generator, PromptLibrary::builtin(), settings())
}
