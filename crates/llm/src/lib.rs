//! LLM integration crate for LearnPath.
//!
//! Two layers:
//! - [`LlmClient`]: provider seam (Gemini, Ollama), one completion per call
//! - [`GenerationClient`]: prompt assembly, timeout, JSON extraction and the
//!   connection probe used by the orchestrator
//!
//! # Example
//! ```no_run
//! use learnpath_core::AppConfig;
//! use learnpath_llm::create_generation_client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let generator = create_generation_client(&config)?;
//! let answer = generator
//!     .generate_structured("What is a closure?", "You are a tutor.", None, None)
//!     .await?;
//! println!("{}", answer);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod generation;
pub mod json;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, create_generation_client};
pub use generation::{
    assemble_prompt, GenerationClient, OfflineClient, SamplingSettings, StructuredClient,
    DEFAULT_SCHEMA_INSTRUCTION,
};
pub use json::{extract_json, is_raw_response, RAW_RESPONSE_KEY};
pub use providers::{GeminiClient, OllamaClient};
