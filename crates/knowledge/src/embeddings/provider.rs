//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{GeminiProvider, MockProvider, OllamaProvider};
use securerag_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "gemini", "ollama", "mock")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }

    /// Embed a search query. Providers with query-specific task types override this.
    async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        self.embed(text).await
    }
}

/// Create a provider, reading its API key from the configured environment variable.
pub fn create_provider_from_env(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let api_key = AppConfig::resolve_api_key(&config.api_key_env);
    create_provider(config, api_key.as_deref())
}

/// Create an embedding provider based on configuration.
///
/// # Errors
/// `EmbeddingInit` when the provider is unknown, a required key is missing,
/// or the HTTP client cannot be built.
pub fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    config
        .validate()
        .map_err(|e| AppError::EmbeddingInit(e.to_string()))?;

    tracing::debug!(
        "Creating embedding provider: provider={}, model={}, dimensions={}",
        config.provider,
        config.model,
        config.dimensions
    );

    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::with_model(
            config.model.clone(),
            config.dimensions,
        ))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),

        "gemini" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::EmbeddingInit(format!(
                    "Gemini embeddings require an API key in ${}",
                    config.api_key_env
                ))
            })?;
            Ok(Arc::new(GeminiProvider::new(config, api_key)?))
        }

        _ => Err(AppError::EmbeddingInit(format!(
            "Unknown embedding provider: '{}'. Supported providers: gemini, ollama, mock",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&EmbeddingConfig::mock(384), None).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "unknown".to_string(),
            ..EmbeddingConfig::mock(384)
        };

        let result = create_provider(&config, None);
        assert!(matches!(result, Err(AppError::EmbeddingInit(_))));
    }

    #[test]
    fn test_gemini_requires_key() {
        let result = create_provider(&EmbeddingConfig::default(), None);
        match result {
            Err(AppError::EmbeddingInit(msg)) => assert!(msg.contains("GOOGLE_API_KEY")),
            other => panic!("expected EmbeddingInit, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_create_gemini_with_key() {
        let provider = create_provider(&EmbeddingConfig::default(), Some("test-key")).unwrap();
        assert_eq!(provider.provider_name(), "gemini");
        assert_eq!(provider.dimensions(), 768);
    }

    #[test]
    fn test_create_ollama_provider() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            ..EmbeddingConfig::default()
        };

        let provider = create_provider(&config, None).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&EmbeddingConfig::mock(384), None).unwrap();

        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
        assert_eq!(provider.embed_query("test text").await.unwrap(), embedding);
    }
}
