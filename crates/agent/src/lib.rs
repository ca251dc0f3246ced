//! Query orchestrator for LearnPath.
//!
//! Ties the knowledge store, the prompt library and the generation client
//! together: every query gets retrieval context, is routed to the roadmap or
//! answer flow, and is answered by the provider or, failing that, by a
//! deterministic local generator.

pub mod context;
pub mod fallback;
pub mod intent;
pub mod orchestrator;
pub mod session;
pub mod types;

#[cfg(test)]
mod tests;

pub use intent::{classify_intent, ROADMAP_KEYWORDS};
pub use orchestrator::{GenerationOutcome, Orchestrator, OrchestratorSettings};
pub use session::{Session, SessionQuery, SessionStore};
pub use types::{HealthReport, InitReport, QueryResponse, SessionInfo, UserQuery};
