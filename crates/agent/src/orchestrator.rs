//! Query orchestration: retrieve, route, generate, respond.
//!
//! Each query moves through
//! `RECEIVED -> CONTEXT_RETRIEVED -> GENERATING_VIA_PROVIDER | GENERATING_LOCALLY -> RESPONDED`.
//! Retrieval and provider failures degrade the answer, never the call.

use crate::context::{build_context, collect_sources};
use crate::fallback::{local_answer, local_roadmap, polish_answer, polish_roadmap};
use crate::intent::classify_intent;
use crate::session::SessionStore;
use crate::types::{HealthReport, InitReport, QueryResponse, SessionInfo, UserQuery};
use learnpath_core::{AppConfig, AppError, AppResult, RagSettings};
use learnpath_knowledge::KnowledgeStore;
use learnpath_llm::{create_generation_client, is_raw_response, GenerationClient, RAW_RESPONSE_KEY};
use learnpath_prompt::{Flow, PromptInput, PromptLibrary};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::Instrument;

/// Retrieval limits the orchestrator applies per query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorSettings {
    pub max_retrieval_results: usize,
    pub max_context_length: usize,
}

impl From<&RagSettings> for OrchestratorSettings {
    fn from(rag: &RagSettings) -> Self {
        Self {
            max_retrieval_results: rag.max_retrieval_results,
            max_context_length: rag.max_context_length,
        }
    }
}

/// Result of the generation step.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// The provider returned parseable JSON
    Structured(Value),
    /// The provider answered but not with JSON
    Unstructured(String),
    /// No provider answer; carries the reason
    ProviderFailure(String),
}

#[derive(Debug, Clone, Copy)]
struct RuntimeState {
    provider_available: bool,
}

/// The application context: one store, one generator, shared by every query.
pub struct Orchestrator {
    store: Arc<KnowledgeStore>,
    generator: Arc<dyn GenerationClient>,
    prompts: PromptLibrary,
    settings: OrchestratorSettings,
    sessions: SessionStore,
    state: OnceCell<RuntimeState>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<KnowledgeStore>,
        generator: Arc<dyn GenerationClient>,
        prompts: PromptLibrary,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            generator,
            prompts,
            settings,
            sessions: SessionStore::new(),
            state: OnceCell::new(),
        }
    }

    /// Build every collaborator from configuration. Nothing is opened yet.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let store = Arc::new(KnowledgeStore::from_config(config)?);
        let generator = create_generation_client(config)?;
        let prompts = match config.prompts_directory() {
            Some(dir) => PromptLibrary::with_overrides(&dir)?,
            None => PromptLibrary::builtin(),
        };

        Ok(Self::new(store, generator, prompts, OrchestratorSettings::from(&config.rag)))
    }

    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.store
    }

    pub fn generator(&self) -> &Arc<dyn GenerationClient> {
        &self.generator
    }

    pub fn is_initialized(&self) -> bool {
        self.state.initialized()
    }

    /// Whether queries will try the provider.
    pub fn provider_available(&self) -> bool {
        self.state.get().map(|s| s.provider_available).unwrap_or(false)
    }

    /// Open the store and probe the provider. Idempotent.
    ///
    /// # Errors
    /// `AppError::StoreInit` when the knowledge store cannot be opened. A
    /// failed provider probe is not an error; queries then use local fallbacks.
    pub async fn initialize(&self) -> AppResult<InitReport> {
        let state = self
            .state
            .get_or_try_init(|| async {
                self.store.initialize().await?;
                tracing::info!("Knowledge store initialized");

                let provider_available = self.generator.is_remote() && self.generator.test_connection().await;
                if provider_available {
                    tracing::info!("Provider {} available", self.generator.name());
                } else {
                    tracing::warn!(
                        "Provider {} unavailable; entering local-fallback mode",
                        self.generator.name()
                    );
                }

                Ok::<_, AppError>(RuntimeState { provider_available })
            })
            .await?;

        let documents = match self.store.get_stats().await {
            Ok(stats) => stats.total_documents,
            Err(e) => {
                tracing::warn!("Could not read knowledge stats: {}", e);
                0
            }
        };

        Ok(InitReport {
            store_ready: self.store.is_initialized(),
            provider: self.generator.name().to_string(),
            provider_available: state.provider_available,
            documents,
        })
    }

    /// Answer one query.
    ///
    /// # Errors
    /// `AppError::NotInitialized` before [`Self::initialize`] has succeeded and
    /// `AppError::InvalidQuery` for a blank message. Nothing else fails.
    pub async fn process_query(&self, query: UserQuery) -> AppResult<QueryResponse> {
        let started = Instant::now();

        let state = *self.state.get().ok_or_else(|| {
            AppError::NotInitialized("process_query called before initialize".to_string())
        })?;
        if query.message.trim().is_empty() {
            return Err(AppError::InvalidQuery("message must not be empty".to_string()));
        }

        let query_id = uuid::Uuid::new_v4().simple().to_string();
        let span = tracing::info_span!(
            "query",
            id = %&query_id[..8],
            session = query.session_id.as_deref().unwrap_or("-")
        );

        async move {
            tracing::debug!(state = "RECEIVED", chars = query.message.chars().count());

            let results = self
                .store
                .search(&query.message, self.settings.max_retrieval_results, None)
                .await;
            let context = build_context(&results, self.settings.max_context_length);
            let sources = collect_sources(&results);
            tracing::debug!(
                state = "CONTEXT_RETRIEVED",
                documents = results.len(),
                context_chars = context.chars().count()
            );

            let flow = classify_intent(&query.message);

            let outcome = if state.provider_available {
                tracing::debug!(state = "GENERATING_VIA_PROVIDER", flow = %flow);
                self.generate(flow, &query, &context).await
            } else {
                GenerationOutcome::ProviderFailure("provider unavailable since initialization".to_string())
            };

            let (response, generation) = match outcome {
                GenerationOutcome::Structured(value) => (value, "provider"),
                GenerationOutcome::Unstructured(raw) => {
                    tracing::warn!("Provider output was not JSON; polishing locally");
                    let value = match flow {
                        Flow::Roadmap => polish_roadmap(&raw, &query, &context),
                        Flow::Answer => polish_answer(&raw, &query),
                    };
                    (value, "provider_unstructured")
                }
                GenerationOutcome::ProviderFailure(reason) => {
                    if state.provider_available {
                        tracing::warn!("Provider generation failed: {}", reason);
                    }
                    tracing::debug!(state = "GENERATING_LOCALLY", flow = %flow);
                    let value = match flow {
                        Flow::Roadmap => local_roadmap(&query, &context),
                        Flow::Answer => local_answer(&query, &context),
                    };
                    (value, "local")
                }
            };

            if let Some(session_id) = &query.session_id {
                let roadmap = match flow {
                    Flow::Roadmap => response.get("roadmap").cloned(),
                    Flow::Answer => None,
                };
                self.sessions
                    .record(session_id, &query.message, flow, roadmap)
                    .await;
            }

            let mut metadata = Map::new();
            metadata.insert("intent".to_string(), json!(flow.as_str()));
            metadata.insert("generation".to_string(), json!(generation));
            metadata.insert("prompt_type".to_string(), json!(query.prompt_type.as_str()));
            metadata.insert("documents_retrieved".to_string(), json!(results.len()));
            metadata.insert("query_id".to_string(), json!(query_id));

            let processing_time = started.elapsed().as_secs_f64();
            tracing::debug!(state = "RESPONDED", generation, processing_time);

            Ok(QueryResponse {
                response,
                context_used: if context.is_empty() { Vec::new() } else { vec![context] },
                retrieval_sources: sources,
                processing_time,
                session_id: query.session_id.clone(),
                metadata,
            })
        }
        .instrument(span)
        .await
    }

    async fn generate(&self, flow: Flow, query: &UserQuery, context: &str) -> GenerationOutcome {
        let input = PromptInput {
            message: &query.message,
            context: query.context.as_ref(),
            user_profile: query.user_profile.as_ref(),
        };
        let prompt = match self.prompts.build(query.prompt_type, flow, &input) {
            Ok(prompt) => prompt,
            Err(e) => return GenerationOutcome::ProviderFailure(format!("prompt build failed: {}", e)),
        };
        tracing::debug!("Using prompt {}", prompt.source_prompt_id);

        let context = (!context.is_empty()).then_some(context);
        match self
            .generator
            .generate_structured(&prompt.user, &prompt.system, context, prompt.schema.as_deref())
            .await
        {
            Ok(value) if is_raw_response(&value) => GenerationOutcome::Unstructured(
                value[RAW_RESPONSE_KEY].as_str().unwrap_or_default().to_string(),
            ),
            Ok(Value::Object(map)) => GenerationOutcome::Structured(Value::Object(map)),
            Ok(other) => GenerationOutcome::Unstructured(other.to_string()),
            Err(e) => GenerationOutcome::ProviderFailure(e.to_string()),
        }
    }

    pub async fn session_info(&self, session_id: &str) -> SessionInfo {
        self.sessions.info(session_id).await
    }

    /// Last roadmap stored for a session.
    pub async fn session_roadmap(&self, session_id: &str) -> Option<Value> {
        self.sessions.get(session_id).await.and_then(|s| s.roadmap)
    }

    pub async fn health(&self) -> HealthReport {
        let initialized = self.is_initialized();
        let provider_available = self.provider_available();
        let store_ready = self.store.is_initialized();

        let knowledge_base_stats = if store_ready {
            self.store.get_stats().await.ok()
        } else {
            None
        };

        let status = match (initialized, provider_available) {
            (false, _) => "unavailable",
            (true, true) => "healthy",
            (true, false) => "degraded",
        };

        HealthReport {
            status: status.to_string(),
            initialized,
            store_ready,
            provider_available,
            knowledge_base_stats,
            active_sessions: self.sessions.len().await,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
