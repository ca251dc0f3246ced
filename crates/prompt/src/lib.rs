//! Prompt system for LearnPath.
//!
//! This crate provides the prompt template sets used by the orchestrator:
//! - Built-in definitions per prompt type and response flow
//! - YAML-based overrides
//! - Handlebars template rendering

pub mod builder;
pub mod library;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use library::PromptLibrary;
pub use loader::{load_definitions, load_prompt_file};
pub use types::{BuiltPrompt, Flow, PromptDefinition, PromptInput, PromptType};
