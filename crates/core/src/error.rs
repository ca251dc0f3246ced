//! Error types for LearnPath.
//!
//! A single error enum covers every failure category in the workspace. The
//! variants follow the degradation policy of the query pipeline: only
//! `StoreInit` and `NotInitialized` are meant to reach the outermost caller,
//! everything else is absorbed somewhere below it.

use thiserror::Error;

/// Unified error type for LearnPath.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The knowledge store could not be opened. Fatal for retrieval.
    #[error("Knowledge store initialization failed: {0}")]
    StoreInit(String),

    /// A single document (or chunk of documents) could not be embedded or written
    #[error("Failed to persist document: {0}")]
    DocumentPersist(String),

    /// Nearest-neighbour lookup failed
    #[error("Search failed: {0}")]
    Search(String),

    /// Other knowledge store failures (reset, stats, lookups, ingestion files)
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Generation provider failed: auth, quota, network or timeout
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The query was rejected before any retrieval or generation work
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The query path was used before `initialize()` completed
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the error must abort the caller rather than degrade the answer.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::StoreInit(_) | AppError::NotInitialized(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
