//! LearnPath Core Library
//!
//! Foundational utilities shared by every LearnPath crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, KnowledgeSettings, RagSettings};
pub use error::{AppError, AppResult};
