//! Structured Generation Client.
//!
//! [`GenerationClient`] is the one interface the orchestrator talks to. Two
//! implementations exist: [`StructuredClient`], which wraps a provider
//! [`LlmClient`] behind a timeout, and [`OfflineClient`], which stands in when
//! no provider is configured and fails every call.

use crate::client::{LlmClient, LlmRequest};
use crate::json::extract_json;
use learnpath_core::{AppError, AppResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Appended to the system instruction when the caller gives no schema.
pub const DEFAULT_SCHEMA_INSTRUCTION: &str =
    "Respond with valid JSON only. Do not include any text outside the JSON structure.";

const CONNECTION_PROBE_PROMPT: &str = "Hello, respond OK";
const CONNECTION_PROBE_INSTRUCTION: &str = "Respond with exactly: OK";

/// Sampling parameters sent with every provider call.
#[derive(Debug, Clone, Copy)]
pub struct SamplingSettings {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 4096,
        }
    }
}

/// Text and structured generation with a liveness probe.
#[async_trait::async_trait]
pub trait GenerationClient: Send + Sync {
    /// Short name for logs and health output.
    fn name(&self) -> &str;

    /// Whether calls leave the process. `false` for the offline client.
    fn is_remote(&self) -> bool;

    /// Generate free text from the prompt, optional system instruction and context.
    ///
    /// Fails with `AppError::ProviderUnavailable` on any provider problem.
    async fn generate_text(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        context: Option<&str>,
    ) -> AppResult<String>;

    /// Generate and parse a JSON object.
    ///
    /// Unparseable or non-object output is returned as `{"raw_response": text}`, not as an
    /// error. Only provider failures surface as `Err`.
    async fn generate_structured(
        &self,
        prompt: &str,
        system_instruction: &str,
        context: Option<&str>,
        schema_instruction: Option<&str>,
    ) -> AppResult<Value> {
        let schema = schema_instruction.unwrap_or(DEFAULT_SCHEMA_INSTRUCTION);
        let system = format!("{}\n\n{}", system_instruction, schema);

        let raw = self.generate_text(prompt, Some(&system), context).await?;
        Ok(extract_json(&raw))
    }

    /// Probe the provider with a minimal prompt. Never fails; errors read as `false`.
    async fn test_connection(&self) -> bool {
        match self
            .generate_text(
                CONNECTION_PROBE_PROMPT,
                Some(CONNECTION_PROBE_INSTRUCTION),
                None,
            )
            .await
        {
            Ok(text) => text.contains("OK"),
            Err(e) => {
                tracing::warn!("Connection test for {} failed: {}", self.name(), e);
                false
            }
        }
    }
}

/// Concatenate the labelled prompt sections in their fixed order.
///
/// Absent or blank sections are left out.
pub fn assemble_prompt(prompt: &str, system_instruction: Option<&str>, context: Option<&str>) -> String {
    let mut sections = Vec::with_capacity(3);

    if let Some(system) = system_instruction.filter(|s| !s.trim().is_empty()) {
        sections.push(format!("SYSTEM INSTRUCTION:\n{}", system.trim()));
    }
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        sections.push(format!("CONTEXT:\n{}", context.trim()));
    }
    sections.push(format!("USER QUERY:\n{}", prompt.trim()));

    sections.join("\n\n")
}

/// Generation client backed by a real provider.
pub struct StructuredClient {
    client: Arc<dyn LlmClient>,
    model: String,
    timeout: Duration,
    sampling: SamplingSettings,
}

impl StructuredClient {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            model: model.into(),
            timeout,
            sampling: SamplingSettings::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingSettings) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl GenerationClient for StructuredClient {
    fn name(&self) -> &str {
        self.client.provider_name()
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn generate_text(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        context: Option<&str>,
    ) -> AppResult<String> {
        let full_prompt = assemble_prompt(prompt, system_instruction, context);
        let request = LlmRequest::new(full_prompt, &self.model)
            .with_temperature(self.sampling.temperature)
            .with_sampling(self.sampling.top_p, self.sampling.top_k)
            .with_max_tokens(self.sampling.max_output_tokens);

        let started = std::time::Instant::now();
        let response = tokio::time::timeout(self.timeout, self.client.complete(&request))
            .await
            .map_err(|_| {
                AppError::ProviderUnavailable(format!(
                    "{} did not answer within {}s",
                    self.client.provider_name(),
                    self.timeout.as_secs_f32()
                ))
            })??;

        tracing::debug!(
            "{} answered in {:?} ({} tokens)",
            self.client.provider_name(),
            started.elapsed(),
            response.usage.total_tokens
        );

        if response.content.trim().is_empty() {
            return Err(AppError::ProviderUnavailable(format!(
                "{} returned an empty response",
                self.client.provider_name()
            )));
        }

        Ok(response.content)
    }
}

/// Local stand-in used when no provider is configured.
#[derive(Debug, Clone)]
pub struct OfflineClient {
    reason: String,
}

impl OfflineClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait::async_trait]
impl GenerationClient for OfflineClient {
    fn name(&self) -> &str {
        "offline"
    }

    fn is_remote(&self) -> bool {
        false
    }

    async fn generate_text(
        &self,
        _prompt: &str,
        _system_instruction: Option<&str>,
        _context: Option<&str>,
    ) -> AppResult<String> {
        Err(AppError::ProviderUnavailable(self.reason.clone()))
    }

    async fn test_connection(&self) -> bool {
        false
    }
}
