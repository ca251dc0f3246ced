//! Ask command handler.
//!
//! Runs one query through the orchestrator and prints the response JSON.

use super::{print_json, start_orchestrator};
use clap::Args;
use learnpath_agent::UserQuery;
use learnpath_core::{config::AppConfig, AppError, AppResult};
use learnpath_prompt::PromptType;
use serde_json::Value;
use std::path::PathBuf;

/// Ask a question or request a learning roadmap
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question or request
    pub message: Option<String>,

    /// Read the message from a file
    #[arg(short, long, conflicts_with = "message")]
    pub file: Option<PathBuf>,

    /// Session identifier; roadmaps are remembered per session
    #[arg(short, long)]
    pub session: Option<String>,

    /// Prompting strategy (zero_shot, one_shot, multi_shot, dynamic, chain_of_thought)
    #[arg(long, default_value = "zero_shot")]
    pub prompt_type: PromptType,

    /// Learner profile as a JSON object
    #[arg(long)]
    pub profile: Option<String>,

    /// Additional context as a JSON object
    #[arg(long)]
    pub context: Option<String>,

    /// Print only the `response` payload
    #[arg(long)]
    pub response_only: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let query = self.build_query()?;
        let orchestrator = start_orchestrator(config).await?;
        let response = orchestrator.process_query(query).await?;

        tracing::debug!(
            "Answered in {:.2}s from {} sources",
            response.processing_time,
            response.retrieval_sources.len()
        );

        if self.response_only {
            print_json(&response.response)
        } else {
            print_json(&response)
        }
    }

    fn build_query(&self) -> AppResult<UserQuery> {
        let message = match (&self.message, &self.file) {
            (Some(message), _) => message.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => {
                return Err(AppError::InvalidQuery(
                    "No message provided; pass it as an argument or with --file".to_string(),
                ))
            }
        };

        let mut query = UserQuery::new(message).with_prompt_type(self.prompt_type);
        if let Some(session) = &self.session {
            query = query.with_session(session.clone());
        }
        if let Some(profile) = &self.profile {
            query = query.with_user_profile(parse_object("--profile", profile)?);
        }
        if let Some(context) = &self.context {
            query = query.with_context(parse_object("--context", context)?);
        }
        Ok(query)
    }
}

/// Parse a flag value that must be a JSON object.
pub(crate) fn parse_object(flag: &str, raw: &str) -> AppResult<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::InvalidQuery(format!("{} is not valid JSON: {}", flag, e)))?;
    if !value.is_object() {
        return Err(AppError::InvalidQuery(format!("{} must be a JSON object", flag)));
    }
    Ok(value)
}
