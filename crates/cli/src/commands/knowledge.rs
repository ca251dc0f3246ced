//! Knowledge command handler.
//!
//! Maintenance operations on the knowledge store.

use super::print_json;
use clap::{Args, Subcommand};
use learnpath_core::{config::AppConfig, AppError, AppResult};
use learnpath_knowledge::{DocumentType, KnowledgeStore, SearchFilters};

/// Knowledge store management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Show store statistics
    Stats(KnowledgeStatsCommand),
    /// Search the store without generating an answer
    Search(KnowledgeSearchCommand),
    /// Show one document
    Get(KnowledgeGetCommand),
    /// Delete one document
    Delete(KnowledgeGetCommand),
    /// Delete every document
    Reset(KnowledgeResetCommand),
}

/// Show store statistics
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub async fn execute(&self, store: &KnowledgeStore) -> AppResult<()> {
        let stats = store.get_stats().await?;

        if self.json {
            return print_json(&stats);
        }

        println!("Knowledge store: {}", store.settings().persist_directory.display());
        println!("  Documents: {}", stats.total_documents);
        println!(
            "  Embeddings: {} ({} dims)",
            stats.embedding_model, stats.embedding_dimensions
        );
        for (document_type, count) in &stats.document_types {
            println!("  {}: {}", document_type, count);
        }
        if !stats.difficulties.is_empty() {
            println!("  Difficulty:");
            for (difficulty, count) in &stats.difficulties {
                println!("    {}: {}", difficulty, count);
            }
        }
        Ok(())
    }
}

/// Search the store
#[derive(Args, Debug)]
pub struct KnowledgeSearchCommand {
    /// Query text
    pub query: String,

    /// Number of results to retrieve
    #[arg(short = 'k', long, default_value = "5")]
    pub top_k: usize,

    /// Only this document type
    #[arg(long = "type")]
    pub document_type: Option<DocumentType>,

    /// Only this difficulty
    #[arg(long)]
    pub difficulty: Option<String>,
}

impl KnowledgeSearchCommand {
    pub async fn execute(&self, store: &KnowledgeStore) -> AppResult<()> {
        let mut filters = SearchFilters::new();
        if let Some(document_type) = self.document_type {
            filters = filters.with_document_type(document_type);
        }
        if let Some(difficulty) = &self.difficulty {
            filters = filters.with_difficulty(difficulty.clone());
        }

        let results = store.search(&self.query, self.top_k, Some(&filters)).await;
        tracing::debug!("Search returned {} results", results.len());
        print_json(&results)
    }
}

/// Select a document by id
#[derive(Args, Debug)]
pub struct KnowledgeGetCommand {
    /// Document id
    pub id: String,
}

/// Delete every document
#[derive(Args, Debug)]
pub struct KnowledgeResetCommand {
    /// Confirm the reset
    #[arg(long)]
    pub yes: bool,
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = KnowledgeStore::from_config(config)?;
        store.initialize().await?;

        match &self.action {
            KnowledgeAction::Stats(cmd) => cmd.execute(&store).await,
            KnowledgeAction::Search(cmd) => cmd.execute(&store).await,
            KnowledgeAction::Get(cmd) => match store.get_document(&cmd.id).await? {
                Some(document) => print_json(&document),
                None => Err(AppError::Knowledge(format!("No document with id {}", cmd.id))),
            },
            KnowledgeAction::Delete(cmd) => {
                if store.delete_document(&cmd.id).await? {
                    println!("Deleted {}", cmd.id);
                    Ok(())
                } else {
                    Err(AppError::Knowledge(format!("No document with id {}", cmd.id)))
                }
            }
            KnowledgeAction::Reset(cmd) => {
                if !cmd.yes {
                    return Err(AppError::Config(
                        "Refusing to reset without --yes".to_string(),
                    ));
                }
                if store.reset().await {
                    println!("Knowledge store reset");
                    Ok(())
                } else {
                    Err(AppError::Knowledge("Reset failed; see the log".to_string()))
                }
            }
        }
    }
}
