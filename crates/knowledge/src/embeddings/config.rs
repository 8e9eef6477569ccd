//! Embedding configuration.

use crate::index::IndexManifest;
use securerag_core::config::EmbeddingSettings;
use securerag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedding configuration shared by the indexer and the retriever.
///
/// Provider, model and dimensions must be identical at index and query time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "gemini", "ollama", "mock"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Whether to normalize embeddings to unit length
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Custom endpoint (provider default when absent)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Attempts per request
    pub max_retries: u32,
}

fn default_normalize() -> bool {
    true
}

fn default_batch_size() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::from(&EmbeddingSettings::default())
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            normalize: true,
            batch_size: settings.batch_size,
            api_key_env: settings.api_key_env.clone(),
            endpoint: settings.endpoint.clone(),
            timeout_secs: settings.timeout_secs,
            max_retries: settings.max_retries,
        }
    }
}

impl EmbeddingConfig {
    /// Offline configuration using the deterministic mock provider.
    pub fn mock(dimensions: usize) -> Self {
        Self {
            provider: "mock".to_string(),
            model: super::providers::mock::MOCK_MODEL.to_string(),
            dimensions,
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Human-readable model identity, e.g. `gemini:models/embedding-001 (768 dims)`.
    pub fn identity(&self) -> String {
        format_identity(&self.provider, &self.model, self.dimensions)
    }

    /// Check numeric bounds.
    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(AppError::Config(
                "embedding batch size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Ensure this configuration embeds into the same space as an index.
    pub fn validate_consistency(&self, manifest: &IndexManifest) -> AppResult<()> {
        let indexed = manifest.embedding_identity();
        let configured = self.identity();

        if indexed != configured {
            return Err(AppError::ModelMismatch {
                indexed,
                configured,
            });
        }

        Ok(())
    }
}

/// Format a provider/model/dimensions triple.
pub fn format_identity(provider: &str, model: &str, dimensions: usize) -> String {
    format!("{}:{} ({} dims)", provider, model, dimensions)
}
