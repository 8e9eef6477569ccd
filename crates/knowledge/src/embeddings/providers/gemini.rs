//! Google Generative Language embedding provider.
//!
//! Uses `models/{model}:batchEmbedContents`. Documents are embedded with the
//! `RETRIEVAL_DOCUMENT` task type and queries with `RETRIEVAL_QUERY`.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::retry::{with_retries, RetryError, RetryPolicy};
use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use securerag_core::{AppError, AppResult};
use securerag_llm::providers::gemini::{
    describe_error, is_credential_error, model_resource, API_KEY_HEADER, DEFAULT_GEMINI_URL,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Texts accepted per `batchEmbedContents` call.
const MAX_REQUESTS_PER_CALL: usize = 100;

const TASK_DOCUMENT: &str = "RETRIEVAL_DOCUMENT";
const TASK_QUERY: &str = "RETRIEVAL_QUERY";

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

/// Gemini embedding provider.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    retry: RetryPolicy,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    /// Create a provider. The key is required and never logged.
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::EmbeddingInit(format!(
                "Gemini embeddings require an API key in ${}",
                config.api_key_env
            )));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                AppError::EmbeddingInit(format!("Failed to create HTTP client for Gemini: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config
                .endpoint
                .as_deref()
                .unwrap_or(DEFAULT_GEMINI_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    fn build_request<'a>(
        &self,
        resource: &'a str,
        texts: &'a [String],
        task_type: &'static str,
    ) -> BatchEmbedRequest<'a> {
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: resource,
                    content: Content {
                        parts: vec![Part { text }],
                    },
                    task_type,
                })
                .collect(),
        }
    }

    /// One `batchEmbedContents` call (no retries).
    #[instrument(skip(self, texts), fields(batch_size = texts.len()))]
    async fn embed_call(
        &self,
        texts: &[String],
        task_type: &'static str,
    ) -> Result<Vec<Vec<f32>>, RetryError> {
        let resource = model_resource(&self.model);
        let url = format!("{}/{}:batchEmbedContents", self.base_url, resource);
        let request = self.build_request(&resource, texts, task_type);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                RetryError::Transient(AppError::Embedding(format!(
                    "Failed to send request to Gemini: {}",
                    e
                )))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_failure(status, &body));
        }

        let body: BatchEmbedResponse = response.json().await.map_err(|e| {
            RetryError::Transient(AppError::Embedding(format!(
                "Failed to parse Gemini response: {}",
                e
            )))
        })?;

        self.check_response(texts.len(), body)
            .map_err(RetryError::Permanent)
    }

    fn check_response(&self, expected: usize, body: BatchEmbedResponse) -> AppResult<Vec<Vec<f32>>> {
        if body.embeddings.len() != expected {
            return Err(AppError::Embedding(format!(
                "Gemini returned {} embeddings for {} texts",
                body.embeddings.len(),
                expected
            )));
        }

        body.embeddings
            .into_iter()
            .map(|embedding| {
                if embedding.values.len() == self.dimensions {
                    Ok(embedding.values)
                } else {
                    Err(AppError::Embedding(format!(
                        "Gemini model '{}' returned {} dimensions, expected {}",
                        self.model,
                        embedding.values.len(),
                        self.dimensions
                    )))
                }
            })
            .collect()
    }

    async fn embed_with_task(
        &self,
        texts: &[String],
        task_type: &'static str,
    ) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_REQUESTS_PER_CALL) {
            let mut vectors = with_retries(self.retry, "Gemini embedding", || {
                self.embed_call(batch, task_type)
            })
            .await?;
            embeddings.append(&mut vectors);
        }

        debug!("Generated {} Gemini embeddings", embeddings.len());
        Ok(embeddings)
    }
}

/// Map a non-success response to a retry decision.
fn classify_failure(status: StatusCode, body: &str) -> RetryError {
    let message = format!("Gemini API error ({}): {}", status, describe_error(body));

    if is_credential_error(status, body) {
        RetryError::Permanent(AppError::Embedding(format!(
            "credential rejected: {}",
            message
        )))
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        RetryError::Transient(AppError::Embedding(message))
    } else {
        RetryError::Permanent(AppError::Embedding(message))
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "gemini", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.embed_with_task(texts, TASK_DOCUMENT).await
    }

    async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_with_task(&[text.to_string()], TASK_QUERY).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(&EmbeddingConfig::default(), "test-key").unwrap()
    }

    #[test]
    fn test_requires_key() {
        assert!(matches!(
            GeminiProvider::new(&EmbeddingConfig::default(), ""),
            Err(AppError::EmbeddingInit(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let rendered = format!("{:?}", provider());
        assert!(!rendered.contains("test-key"));
        assert!(rendered.contains("models/embedding-001"));
    }

    #[test]
    fn test_request_shape() {
        let provider = provider();
        let texts = vec!["Bonus Policy".to_string(), "Deployment Guide".to_string()];
        let resource = model_resource(&provider.model);

        let json =
            serde_json::to_value(provider.build_request(&resource, &texts, TASK_DOCUMENT)).unwrap();

        assert_eq!(json["requests"].as_array().unwrap().len(), 2);
        assert_eq!(json["requests"][0]["model"], "models/embedding-001");
        assert_eq!(json["requests"][1]["content"]["parts"][0]["text"], "Deployment Guide");
        assert_eq!(json["requests"][0]["taskType"], "RETRIEVAL_DOCUMENT");
    }

    #[test]
    fn test_response_dimension_check() {
        let provider = GeminiProvider::new(
            &EmbeddingConfig {
                dimensions: 3,
                ..EmbeddingConfig::default()
            },
            "key",
        )
        .unwrap();

        let good: BatchEmbedResponse =
            serde_json::from_str(r#"{"embeddings":[{"values":[0.1,0.2,0.3]}]}"#).unwrap();
        assert_eq!(provider.check_response(1, good).unwrap().len(), 1);

        let short: BatchEmbedResponse =
            serde_json::from_str(r#"{"embeddings":[{"values":[0.1]}]}"#).unwrap();
        assert!(provider.check_response(1, short).is_err());

        let missing: BatchEmbedResponse = serde_json::from_str(r#"{"embeddings":[]}"#).unwrap();
        assert!(provider.check_response(1, missing).is_err());
    }

    #[test]
    fn test_failure_classification() {
        let invalid_key = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, invalid_key),
            RetryError::Permanent(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, "{}"),
            RetryError::Transient(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            RetryError::Transient(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, "no such model"),
            RetryError::Permanent(_)
        ));
    }
}
