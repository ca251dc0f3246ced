//! LearnPath CLI
//!
//! Main entry point for the learnpath command-line tool.
//! Answers learning questions and builds roadmaps with retrieval-augmented
//! generation over a local knowledge store.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, CheckCommand, IngestCommand, KnowledgeCommand};
use learnpath_core::{config::AppConfig, logging, AppError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;

/// LearnPath - learning assistant with local-first RAG
#[derive(Parser, Debug)]
#[command(name = "learnpath")]
#[command(about = "Learning roadmaps and answers with local-first RAG", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "LEARNPATH_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "LEARNPATH_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (gemini, ollama)
    #[arg(short, long, global = true, env = "LEARNPATH_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "LEARNPATH_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question or request a learning roadmap
    Ask(AskCommand),

    /// Interactive chat session on stdin
    Chat(ChatCommand),

    /// Load documents into the knowledge store
    Ingest(IngestCommand),

    /// Knowledge store management
    Knowledge(KnowledgeCommand),

    /// Check configuration, store and provider health
    Check(CheckCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration; --workspace and --config decide which YAML file is read
    let workspace_flag = cli.workspace.clone();
    let config_flag = cli.config.clone();
    let config = AppConfig::load_with(|key| {
        let flag = match key {
            "LEARNPATH_WORKSPACE" => workspace_flag.as_ref(),
            "LEARNPATH_CONFIG" => config_flag.as_ref(),
            _ => None,
        };
        flag.map(|path| path.display().to_string())
            .or_else(|| std::env::var(key).ok())
    })?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    config.validate()?;

    tracing::info!("LearnPath CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    // Ensure .learnpath directory exists
    config.ensure_learnpath_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Ingest(_) => "ingest",
        Commands::Knowledge(_) => "knowledge",
        Commands::Check(_) => "check",
    };
    let span = tracing::info_span!("command", name = command_name);

    // Route to command handlers
    let result = async move {
        match cli.command {
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Chat(cmd) => cmd.execute(&config).await,
            Commands::Ingest(cmd) => cmd.execute(&config).await,
            Commands::Knowledge(cmd) => cmd.execute(&config).await,
            Commands::Check(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    match result {
        Ok(()) => {
            tracing::info!("Command completed successfully");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_fatal() => {
            tracing::error!("Service unavailable: {}", e);
            eprintln!("learnpath: service unavailable: {}", e);
            Ok(ExitCode::from(3))
        }
        Err(AppError::InvalidQuery(reason)) => {
            eprintln!("learnpath: invalid query: {}", reason);
            Ok(ExitCode::from(2))
        }
        Err(e) => {
            tracing::error!("Command failed: {}", e);
            Err(e.into())
        }
    }
}
