//! Configuration management for LearnPath.
//!
//! Configuration is resolved from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.learnpath/config.yaml` or `--config`)
//! - Environment variables
//! - Command-line flags
//!
//! The provider API key is only ever read from the environment. Its absence is
//! not an error: the system runs in permanent local-fallback mode.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Providers the generation factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .learnpath/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider ("gemini" or "ollama")
    pub provider: String,

    /// Provider model identifier
    pub model: String,

    /// API key for the generation provider
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Custom provider endpoint
    pub endpoint: Option<String>,

    /// Upper bound on a single provider call, in seconds
    pub provider_timeout_secs: u64,

    /// Knowledge store settings
    pub knowledge: KnowledgeSettings,

    /// Retrieval settings
    pub rag: RagSettings,

    /// Directory with prompt override files
    pub prompts_dir: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Knowledge store and embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeSettings {
    /// Where the store keeps its files. Defaults to `.learnpath/store`.
    pub persist_directory: Option<PathBuf>,

    /// Embedding provider ("trigram" or "ollama")
    pub embedding_provider: String,

    /// Embedding model identifier; also stamps the collection
    pub embedding_model: String,

    /// Embedding vector dimensions
    pub embedding_dimensions: usize,

    /// Endpoint for HTTP embedding providers
    pub embedding_endpoint: Option<String>,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            persist_directory: None,
            embedding_provider: "trigram".to_string(),
            embedding_model: "trigram-v1".to_string(),
            embedding_dimensions: 384,
            embedding_endpoint: None,
        }
    }
}

/// Retrieval settings shared by the store and the orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RagSettings {
    /// Global cap on search results
    pub max_retrieval_results: usize,

    /// Results scoring below this similarity are dropped (0.0 - 1.0)
    pub similarity_threshold: f32,

    /// Maximum context length handed to the provider, in characters
    pub max_context_length: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            max_retrieval_results: 5,
            // Hash-based embeddings score lower than neural ones
            similarity_threshold: 0.3,
            max_context_length: 8000,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    llm: Option<LlmSection>,
    knowledge: Option<KnowledgeSection>,
    rag: Option<RagSection>,
    prompts: Option<PromptsSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeSection {
    persist_directory: Option<String>,
    embedding_provider: Option<String>,
    embedding_model: Option<String>,
    embedding_dimensions: Option<usize>,
    embedding_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RagSection {
    max_retrieval_results: Option<usize>,
    similarity_threshold: Option<f32>,
    max_context_length: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PromptsSection {
    directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "gemini".to_string(),
            model: "gemini-1.5-pro-latest".to_string(),
            api_key: None,
            endpoint: None,
            provider_timeout_secs: 60,
            knowledge: KnowledgeSettings::default(),
            rag: RagSettings::default(),
            prompts_dir: None,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `LEARNPATH_WORKSPACE`, `LEARNPATH_CONFIG`
    /// - `LEARNPATH_PROVIDER`, `LEARNPATH_MODEL` / `GEMINI_MODEL`, `LEARNPATH_ENDPOINT`
    /// - `GEMINI_API_KEY` / `LEARNPATH_API_KEY`, `LEARNPATH_PROVIDER_TIMEOUT`
    /// - `LEARNPATH_PERSIST_DIRECTORY`, `LEARNPATH_EMBEDDING_PROVIDER`, `EMBEDDING_MODEL`
    /// - `MAX_RETRIEVAL_RESULTS`, `SIMILARITY_THRESHOLD`, `MAX_CONTEXT_LENGTH`
    /// - `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use learnpath_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Store: {:?}", config.persist_directory());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load`] with an injectable environment lookup.
    pub fn load_with<F>(env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workspace) = env("LEARNPATH_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Some(config_file) = env("LEARNPATH_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.learnpath_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env(env)?;

        Ok(config)
    }

    /// Environment variables override YAML config.
    fn apply_env<F>(&mut self, env: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = env("LEARNPATH_PROVIDER") {
            self.provider = provider.to_lowercase();
        }

        if let Some(model) = env("LEARNPATH_MODEL").or_else(|| env("GEMINI_MODEL")) {
            self.model = model;
        }

        if let Some(endpoint) = env("LEARNPATH_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }

        self.api_key = env("LEARNPATH_API_KEY")
            .or_else(|| env("GEMINI_API_KEY"))
            .filter(|key| !key.trim().is_empty());

        if let Some(timeout) = parse_env(&env, "LEARNPATH_PROVIDER_TIMEOUT")? {
            self.provider_timeout_secs = timeout;
        }

        if let Some(dir) = env("LEARNPATH_PERSIST_DIRECTORY") {
            self.knowledge.persist_directory = Some(PathBuf::from(dir));
        }

        if let Some(provider) = env("LEARNPATH_EMBEDDING_PROVIDER") {
            self.knowledge.embedding_provider = provider.to_lowercase();
        }

        if let Some(model) = env("EMBEDDING_MODEL") {
            self.knowledge.embedding_model = model;
        }

        if let Some(max) = parse_env(&env, "MAX_RETRIEVAL_RESULTS")? {
            self.rag.max_retrieval_results = max;
        }

        if let Some(threshold) = parse_env(&env, "SIMILARITY_THRESHOLD")? {
            self.rag.similarity_threshold = threshold;
        }

        if let Some(length) = parse_env(&env, "MAX_CONTEXT_LENGTH")? {
            self.rag.max_context_length = length;
        }

        self.log_level = env("RUST_LOG").or(self.log_level.take());

        if env("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider.to_lowercase();
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if llm.endpoint.is_some() {
                result.endpoint = llm.endpoint;
            }
            if let Some(timeout) = llm.timeout_secs {
                result.provider_timeout_secs = timeout;
            }
        }

        if let Some(knowledge) = config_file.knowledge {
            if let Some(dir) = knowledge.persist_directory {
                result.knowledge.persist_directory = Some(PathBuf::from(dir));
            }
            if let Some(provider) = knowledge.embedding_provider {
                result.knowledge.embedding_provider = provider.to_lowercase();
            }
            if let Some(model) = knowledge.embedding_model {
                result.knowledge.embedding_model = model;
            }
            if let Some(dimensions) = knowledge.embedding_dimensions {
                result.knowledge.embedding_dimensions = dimensions;
            }
            if knowledge.embedding_endpoint.is_some() {
                result.knowledge.embedding_endpoint = knowledge.embedding_endpoint;
            }
        }

        if let Some(rag) = config_file.rag {
            if let Some(max) = rag.max_retrieval_results {
                result.rag.max_retrieval_results = max;
            }
            if let Some(threshold) = rag.similarity_threshold {
                result.rag.similarity_threshold = threshold;
            }
            if let Some(length) = rag.max_context_length {
                result.rag.max_context_length = length;
            }
        }

        if let Some(dir) = config_file.prompts.and_then(|p| p.directory) {
            result.prompts_dir = Some(PathBuf::from(dir));
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider.to_lowercase();
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .learnpath directory.
    pub fn learnpath_dir(&self) -> PathBuf {
        self.workspace.join(".learnpath")
    }

    /// Ensure the .learnpath directory exists.
    pub fn ensure_learnpath_dir(&self) -> AppResult<()> {
        let dir = self.learnpath_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .learnpath directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Directory holding the knowledge store files.
    pub fn persist_directory(&self) -> PathBuf {
        match &self.knowledge.persist_directory {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.workspace.join(dir),
            None => self.learnpath_dir().join("store"),
        }
    }

    /// Directory with prompt override files, if configured.
    pub fn prompts_directory(&self) -> Option<PathBuf> {
        self.prompts_dir.as_ref().map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                self.workspace.join(dir)
            }
        })
    }

    /// Whether a provider API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Validate the resolved configuration.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !(0.0..=1.0).contains(&self.rag.similarity_threshold) {
            return Err(AppError::Config(format!(
                "Similarity threshold must be within [0, 1], got {}",
                self.rag.similarity_threshold
            )));
        }

        if self.rag.max_retrieval_results == 0 {
            return Err(AppError::Config(
                "max_retrieval_results must be at least 1".to_string(),
            ));
        }

        if self.knowledge.embedding_dimensions == 0 {
            return Err(AppError::Config(
                "embedding_dimensions must be at least 1".to_string(),
            ));
        }

        if self.provider_timeout_secs == 0 {
            return Err(AppError::Config(
                "provider timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<F, T>(env: &F, key: &str) -> AppResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("Invalid value for {}: {} ({})", key, raw, e))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.rag.max_retrieval_results, 5);
        assert_eq!(config.rag.max_context_length, 8000);
        assert!(!config.has_api_key());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().to_string_lossy().to_string();
        let config = AppConfig::load_with(env_from(&[
            ("LEARNPATH_WORKSPACE", workspace.as_str()),
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-1.5-flash"),
            ("SIMILARITY_THRESHOLD", "0.7"),
            ("MAX_RETRIEVAL_RESULTS", "3"),
        ]))
        .unwrap();

        assert!(config.has_api_key());
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.rag.similarity_threshold, 0.7);
        assert_eq!(config.rag.max_retrieval_results, 3);
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().to_string_lossy().to_string();
        let config = AppConfig::load_with(env_from(&[
            ("LEARNPATH_WORKSPACE", workspace.as_str()),
            ("GEMINI_API_KEY", "  "),
        ]))
        .unwrap();
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_invalid_env_number() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().to_string_lossy().to_string();
        let result = AppConfig::load_with(env_from(&[
            ("LEARNPATH_WORKSPACE", workspace.as_str()),
            ("MAX_RETRIEVAL_RESULTS", "many"),
        ]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_yaml_then_env_precedence() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".learnpath");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.yaml"),
            r#"
llm:
  provider: ollama
  model: llama3.2
  timeoutSecs: 20
knowledge:
  persistDirectory: data/store
  embeddingDimensions: 128
rag:
  similarityThreshold: 0.5
  maxContextLength: 2000
"#,
        )
        .unwrap();

        let workspace = temp.path().to_string_lossy().to_string();
        let config = AppConfig::load_with(env_from(&[
            ("LEARNPATH_WORKSPACE", workspace.as_str()),
            ("MAX_CONTEXT_LENGTH", "4000"),
        ]))
        .unwrap();

        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.provider_timeout_secs, 20);
        assert_eq!(config.knowledge.embedding_dimensions, 128);
        assert_eq!(config.rag.similarity_threshold, 0.5);
        assert_eq!(config.rag.max_context_length, 4000);
        assert_eq!(config.persist_directory(), temp.path().join("data/store"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            None,
            None,
            Some("Ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.rag.similarity_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.rag.max_retrieval_results = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_persist_directory() {
        let config = AppConfig::default();
        assert!(config.persist_directory().ends_with(".learnpath/store"));
    }
}
