//! Request and response types for the orchestrator.

use learnpath_knowledge::KnowledgeStats;
use learnpath_prompt::PromptType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A learner's request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserQuery {
    /// The question or request; must not be blank
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default)]
    pub prompt_type: PromptType,

    /// Caller-supplied context mapping, rendered into the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Learner profile (`current_level`, `time_commitment`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<Value>,
}

impl UserQuery {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_prompt_type(mut self, prompt_type: PromptType) -> Self {
        self.prompt_type = prompt_type;
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_user_profile(mut self, user_profile: Value) -> Self {
        self.user_profile = Some(user_profile);
        self
    }

    /// String field from the user profile, if present.
    pub(crate) fn profile_field(&self, key: &str) -> Option<&str> {
        self.user_profile
            .as_ref()
            .and_then(|profile| profile.get(key))
            .and_then(Value::as_str)
    }
}

/// The orchestrator's answer to one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Structured payload; roadmap or `{explanation, key_points, next_steps}`
    pub response: Value,

    /// The context string handed to generation, or empty
    pub context_used: Vec<String>,

    /// Distinct sources of the retrieved documents, in retrieval order
    pub retrieval_sources: Vec<String>,

    /// Wall-clock seconds spent on the query
    pub processing_time: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    pub metadata: Map<String, Value>,
}

/// Outcome of [`crate::Orchestrator::initialize`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitReport {
    pub store_ready: bool,
    pub provider: String,
    pub provider_available: bool,
    pub documents: u64,
}

/// Service health snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// `healthy`, `degraded` or `unavailable`
    pub status: String,
    pub initialized: bool,
    pub store_ready: bool,
    pub provider_available: bool,
    pub knowledge_base_stats: Option<KnowledgeStats>,
    pub active_sessions: usize,
    pub version: String,
}

/// Summary of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub exists: bool,
    pub query_count: usize,
    pub has_roadmap: bool,
}
