//! LLM provider factory.
//!
//! Builds a completion client from the `llm` config section, resolving the
//! API key from the configured environment variable.

use crate::client::LlmClient;
use crate::providers::{ollama::DEFAULT_OLLAMA_URL, GeminiClient, OllamaClient};
use crate::types::ProviderType;
use securerag_core::config::LlmSettings;
use securerag_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client from settings, reading the key from the environment.
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    let api_key = AppConfig::resolve_api_key(&settings.api_key_env);
    create_client_with_key(settings, api_key.as_deref())
}

/// Create an LLM client from settings with an explicit API key.
///
/// # Errors
/// Returns error if:
/// - Provider is unknown
/// - Required secrets are missing
/// - The HTTP client cannot be built
pub fn create_client_with_key(
    settings: &LlmSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider)
        .ok_or_else(|| AppError::Llm(format!("Unknown provider: {}", settings.provider)))?;
    let timeout = Duration::from_secs(settings.timeout_secs);

    match provider {
        ProviderType::Ollama => {
            let base_url = settings.endpoint.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::with_timeout(base_url, timeout)?))
        }
        ProviderType::Gemini => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Llm(format!(
                    "Gemini provider requires an API key in ${}",
                    settings.api_key_env
                ))
            })?;
            Ok(Arc::new(GeminiClient::new(
                settings.endpoint.as_deref(),
                api_key,
                timeout,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> LlmSettings {
        LlmSettings {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_client_with_key(&settings("ollama"), None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_gemini_client() {
        let client = create_client_with_key(&settings("gemini"), Some("key")).unwrap();
        assert_eq!(client.provider_name(), "gemini");
    }

    #[test]
    fn test_gemini_requires_api_key() {
        match create_client_with_key(&settings("gemini"), None) {
            Err(err) => assert!(err.to_string().contains("requires an API key")),
            Ok(_) => panic!("Expected error for Gemini without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client_with_key(&settings("unknown"), None) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
