//! Ingest command handler.
//!
//! Bulk-loads documents from a JSON or JSON Lines file into the store.

use super::print_json;
use clap::Args;
use learnpath_core::{config::AppConfig, AppResult};
use learnpath_knowledge::{load_documents, KnowledgeStore};
use std::path::PathBuf;
use std::time::Instant;

/// Load documents into the knowledge store
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// JSON array or JSON Lines file of documents
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    /// Execute the ingest command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {:?}", self.file);
        let start = Instant::now();

        let documents = load_documents(&self.file)?;
        let total = documents.len();

        let store = KnowledgeStore::from_config(config)?;
        store.initialize().await?;
        let added = store.add_documents_batch(documents).await;

        let duration = start.elapsed().as_secs_f64();
        if self.json {
            print_json(&serde_json::json!({
                "file": self.file,
                "documents": total,
                "added": added,
                "failed": total - added,
                "durationSecs": duration,
            }))?;
        } else {
            println!(
                "Added {}/{} documents from {} in {:.2}s",
                added,
                total,
                self.file.display(),
                duration
            );
        }

        if added < total {
            tracing::warn!("{} documents were not added; see the log for details", total - added);
        }
        Ok(())
    }
}
