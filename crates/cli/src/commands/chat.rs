//! Chat command handler.
//!
//! Line-oriented conversation on stdin. All turns share one session, so a
//! roadmap generated early stays attached to the session.

use super::{print_json, start_orchestrator};
use clap::Args;
use learnpath_agent::UserQuery;
use learnpath_core::{config::AppConfig, AppError, AppResult};
use learnpath_prompt::PromptType;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive chat on stdin (`/quit` to exit, `/session` for session info)
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Session identifier (default: one per process)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Prompting strategy for every turn
    #[arg(long, default_value = "zero_shot")]
    pub prompt_type: PromptType,
}

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let orchestrator = start_orchestrator(config).await?;
        let session_id = self
            .session
            .clone()
            .unwrap_or_else(|| format!("chat-{}", std::process::id()));

        eprintln!("LearnPath chat (session {}). Type /quit to exit.", session_id);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            match line {
                "" => continue,
                "/quit" | "/exit" => break,
                "/session" => {
                    print_json(&orchestrator.session_info(&session_id).await)?;
                    continue;
                }
                _ => {}
            }

            let query = UserQuery::new(line)
                .with_session(session_id.clone())
                .with_prompt_type(self.prompt_type);

            match orchestrator.process_query(query).await {
                Ok(response) => print_json(&response.response)?,
                Err(AppError::InvalidQuery(reason)) => eprintln!("Invalid query: {}", reason),
                Err(e) => return Err(e),
            }
        }

        tracing::info!("Chat session {} ended", session_id);
        Ok(())
    }
}
