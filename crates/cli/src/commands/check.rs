//! Check command handler.
//!
//! Initializes the service and reports its health, including a fresh
//! provider connection test.

use super::{print_json, start_orchestrator};
use clap::Args;
use learnpath_core::{config::AppConfig, AppResult};

/// Check configuration, store and provider health
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CheckCommand {
    /// Execute the check command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing check command");
        config.validate()?;

        let orchestrator = start_orchestrator(config).await?;
        let health = orchestrator.health().await;
        let connection_ok = orchestrator.generator().test_connection().await;

        if self.json {
            let mut output = serde_json::to_value(&health)?;
            if let Some(map) = output.as_object_mut() {
                map.insert("provider".to_string(), config.provider.clone().into());
                map.insert("model".to_string(), config.model.clone().into());
                map.insert("connectionTest".to_string(), connection_ok.into());
            }
            return print_json(&output);
        }

        println!("Status: {}", health.status);
        println!("  Version: {}", health.version);
        println!("  Provider: {} ({})", config.provider, config.model);
        println!("  API key: {}", if config.has_api_key() { "set" } else { "not set" });
        println!(
            "  Connection test: {}",
            if connection_ok { "ok" } else { "failed (local fallback)" }
        );
        println!("  Knowledge store: {}", config.persist_directory().display());
        if let Some(stats) = &health.knowledge_base_stats {
            println!(
                "  Documents: {} ({} / {} dims)",
                stats.total_documents, stats.embedding_model, stats.embedding_dimensions
            );
        }
        Ok(())
    }
}
