//! Ollama Embedding Provider
//!
//! Semantic embeddings via Ollama's local API using models like
//! `nomic-embed-text`. The endpoint embeds one text per request, so batches
//! are sent as a bounded number of concurrent requests.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::retry::{with_retries, RetryError, RetryPolicy};
use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use securerag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Ollama API endpoint for embeddings
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Requests in flight per batch
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Ollama embedding provider using local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    retry: RetryPolicy,
}

/// Request payload for Ollama embeddings API
#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response from Ollama embeddings API
#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Error response from Ollama API
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider from configuration.
    ///
    /// # Errors
    /// * `AppError::EmbeddingInit` - If the HTTP client cannot be built
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                AppError::EmbeddingInit(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        let base_url = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            dimensions: config.dimensions,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    /// Embed single text (no retries)
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>, RetryError> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                RetryError::Transient(AppError::Embedding(format!(
                    "Failed to send request to Ollama at {}: {}",
                    self.base_url, e
                )))
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|body| body.error)
                .unwrap_or(error_text);

            let error = AppError::Embedding(format!("Ollama API error ({}): {}", status, message));

            // A missing model is a 404; pulling it is the fix, not waiting.
            return Err(if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
                RetryError::Permanent(error)
            } else {
                RetryError::Transient(error)
            });
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            RetryError::Transient(AppError::Embedding(format!(
                "Failed to parse Ollama response: {}",
                e
            )))
        })?;

        if body.embedding.len() != self.dimensions {
            return Err(RetryError::Permanent(AppError::Embedding(format!(
                "Ollama model '{}' returned {} dimensions, expected {}",
                self.model,
                body.embedding.len(),
                self.dimensions
            ))));
        }

        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    #[instrument(skip(self, text), fields(text_len = text.len(), provider = "ollama", model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        with_retries(self.retry, "Ollama embedding", || self.embed_single(text)).await
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Embedding batch of {} texts", texts.len());

        // Futures are built up front so the stream holds no borrowing closure.
        let pending: Vec<_> = texts.iter().map(|text| self.embed(text)).collect();

        futures::stream::iter(pending)
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: Option<&str>) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: endpoint.map(str::to_string),
            max_retries: 1,
            timeout_secs: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_defaults_and_trims() {
        let provider = OllamaProvider::new(&config(None)).unwrap();
        assert_eq!(provider.base_url, DEFAULT_OLLAMA_URL);

        let provider = OllamaProvider::new(&config(Some("http://ollama:11434/"))).unwrap();
        assert_eq!(provider.base_url, "http://ollama:11434");
        assert_eq!(provider.dimensions(), 768);
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_requests() {
        let provider = OllamaProvider::new(&config(Some("http://127.0.0.1:9"))).unwrap();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_embedding_error() {
        // Port 9 (discard) is not an Ollama server.
        let provider = OllamaProvider::new(&config(Some("http://127.0.0.1:9"))).unwrap();
        let result = provider.embed("Remote work policy").await;
        assert!(matches!(result, Err(AppError::Embedding(_))));
    }

    fn assert_send<T: Send>(value: T) -> T {
        value
    }

    #[tokio::test]
    async fn test_batch_runs_on_spawned_task() {
        let provider = OllamaProvider::new(&config(Some("http://127.0.0.1:9"))).unwrap();
        let texts = vec!["Bonus policy".to_string(), "Deployment guide".to_string()];

        let result = tokio::spawn(async move {
            assert_send(provider.embed_batch(&texts)).await
        })
        .await
        .unwrap();
        assert!(matches!(result, Err(AppError::Embedding(_))));
    }
}
