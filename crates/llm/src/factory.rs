//! LLM provider factory.
//!
//! Resolves the configured provider into a [`GenerationClient`]. A missing
//! API key for a hosted provider is not an error: the factory hands back an
//! [`OfflineClient`] and the system runs on local fallbacks.

use crate::client::LlmClient;
use crate::generation::{GenerationClient, OfflineClient, StructuredClient};
use crate::providers::gemini::DEFAULT_GEMINI_URL;
use crate::providers::ollama::DEFAULT_OLLAMA_URL;
use crate::providers::{GeminiClient, OllamaClient};
use learnpath_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a provider client by name.
///
/// # Errors
/// Returns `AppError::Config` for an unknown provider and
/// `AppError::ProviderUnavailable` when a hosted provider has no API key.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "gemini" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::ProviderUnavailable("Gemini provider requires an API key".to_string())
            })?;
            let base_url = endpoint.unwrap_or(DEFAULT_GEMINI_URL);
            Ok(Arc::new(GeminiClient::with_base_url(api_key, base_url)))
        }
        "ollama" => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

/// Build the generation client for the resolved configuration.
pub fn create_generation_client(config: &AppConfig) -> AppResult<Arc<dyn GenerationClient>> {
    match create_client(
        &config.provider,
        config.endpoint.as_deref(),
        config.api_key.as_deref(),
    ) {
        Ok(client) => {
            tracing::info!(
                "Using {} provider with model {}",
                client.provider_name(),
                config.model
            );
            let timeout = Duration::from_secs(config.provider_timeout_secs);
            Ok(Arc::new(StructuredClient::new(client, &config.model, timeout)))
        }
        Err(AppError::ProviderUnavailable(reason)) => {
            tracing::warn!("{}; answers will use local fallbacks", reason);
            Ok(Arc::new(OfflineClient::new(reason)))
        }
        Err(e) => Err(e),
    }
}
