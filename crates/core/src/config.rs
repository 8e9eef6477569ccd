//! Configuration management for SecureRAG.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`<workspace>/.securerag/config.yaml` or `SECURERAG_CONFIG`)
//! - Environment variables
//! - Command-line flags (`with_overrides`)
//!
//! Relative paths (the index location) are resolved against the workspace.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers the knowledge crate can construct.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["gemini", "ollama", "mock"];

/// Completion providers the llm crate can construct.
pub const KNOWN_LLM_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .securerag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log filter override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    pub index: IndexSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
}

/// Where the persisted index lives and how documents are chunked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexSettings {
    /// Index directory; relative paths resolve against the workspace
    pub path: PathBuf,

    /// Target chunk length in characters
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("vectorstore"),
            chunk_size: 1000,
            chunk_overlap: 150,
        }
    }
}

/// Embedding service settings. Must be identical at index and query time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// "gemini", "ollama" or "mock"
    pub provider: String,

    /// Provider-specific model identifier
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Custom endpoint (provider default when absent)
    pub endpoint: Option<String>,

    /// Texts per embedding request
    pub batch_size: usize,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Attempts per request before giving up
    pub max_retries: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "models/embedding-001".to_string(),
            dimensions: 768,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            endpoint: None,
            batch_size: 100,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Answer-generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// "gemini" or "ollama"
    pub provider: String,

    pub model: String,

    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    pub temperature: f32,

    pub max_tokens: Option<u32>,

    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            endpoint: None,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            temperature: 0.0,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

/// Query-time settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Candidates fetched before permission filtering
    pub top_k: usize,

    /// Deadline for embedding the query and searching
    pub timeout_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            timeout_secs: 30,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    index: Option<IndexSettings>,
    embedding: Option<EmbeddingSettings>,
    llm: Option<LlmSettings>,
    retrieval: Option<RetrievalSettings>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            index: IndexSettings::default(),
            embedding: EmbeddingSettings::default(),
            llm: LlmSettings::default(),
            retrieval: RetrievalSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment and the config file.
    ///
    /// Environment variables:
    /// - `SECURERAG_WORKSPACE`: Override workspace path
    /// - `SECURERAG_CONFIG`: Path to config file
    /// - `SECURERAG_INDEX_PATH`: Index directory
    /// - `SECURERAG_EMBEDDING_PROVIDER` / `SECURERAG_EMBEDDING_MODEL`
    /// - `SECURERAG_LLM_PROVIDER` / `SECURERAG_LLM_MODEL`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use securerag_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {:?}", config.index_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration using `env` to look up variables.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = env("SECURERAG_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Some(config_file) = env("SECURERAG_CONFIG") {
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
            .unwrap_or_else(|| config.securerag_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Some(path) = env("SECURERAG_INDEX_PATH") {
            config.index.path = PathBuf::from(path);
        }
        if let Some(provider) = env("SECURERAG_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Some(model) = env("SECURERAG_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Some(provider) = env("SECURERAG_LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Some(model) = env("SECURERAG_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Some(level) = env("RUST_LOG") {
            config.log_level = Some(level);
        }
        if env("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
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

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(index) = config_file.index {
            result.index = index;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the file and the environment.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        index_path: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(index_path) = index_path {
            self.index.path = index_path;
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

    /// Get the path to the .securerag directory.
    pub fn securerag_dir(&self) -> PathBuf {
        self.workspace.join(".securerag")
    }

    /// Absolute index location: relative paths resolve against the workspace.
    pub fn index_path(&self) -> PathBuf {
        resolve_path(&self.workspace, &self.index.path)
    }

    /// Read an API key from the named environment variable.
    ///
    /// Empty values count as absent.
    pub fn resolve_api_key(env_var: &str) -> Option<String> {
        std::env::var(env_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate provider names and chunking/retrieval bounds.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if self.index.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be at least 1".to_string()));
        }

        if self.index.chunk_overlap >= self.index.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.index.chunk_overlap, self.index.chunk_size
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be at least 1".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "embedding batchSize must be at least 1".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        Ok(())
    }
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
