//! Command handlers for the LearnPath CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod check;
pub mod ingest;
pub mod knowledge;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use check::CheckCommand;
pub use ingest::IngestCommand;
pub use knowledge::KnowledgeCommand;

use learnpath_agent::Orchestrator;
use learnpath_core::{AppConfig, AppResult};

/// Build and initialize the orchestrator for a query-serving command.
///
/// A store that cannot be opened is returned as the fatal `StoreInit` error;
/// `main` reports it as service unavailable.
pub async fn start_orchestrator(config: &AppConfig) -> AppResult<Orchestrator> {
    let orchestrator = Orchestrator::from_config(config)?;
    let report = orchestrator.initialize().await?;
    tracing::info!(
        "Ready: {} documents, provider {} ({})",
        report.documents,
        report.provider,
        if report.provider_available { "available" } else { "local fallback" }
    );
    Ok(orchestrator)
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
