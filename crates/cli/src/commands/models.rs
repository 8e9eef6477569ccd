//! Models command handler.
//!
//! Lists the Gemini models the configured key can use, marking which ones
//! can answer questions and which can embed text.

use clap::Args;
use securerag_core::{config::AppConfig, AppError, AppResult};
use securerag_llm::{GeminiClient, ModelInfo};
use std::time::Duration;

/// List Gemini models available to the configured API key
#[derive(Args, Debug)]
pub struct ModelsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ModelsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing models command");

        let settings = &config.llm;
        let api_key = AppConfig::resolve_api_key(&settings.api_key_env).ok_or_else(|| {
            AppError::Config(format!(
                "Listing models requires an API key in ${}",
                settings.api_key_env
            ))
        })?;
        // An Ollama endpoint is no use here
        let endpoint = match settings.provider.as_str() {
            "gemini" => settings.endpoint.as_deref(),
            _ => None,
        };

        let client = GeminiClient::new(endpoint, api_key, Duration::from_secs(settings.timeout_secs))?;
        let models = client.list_models().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&models)?);
            return Ok(());
        }

        for model in &models {
            println!("{}", describe_model(model));
        }

        if !models.iter().any(ModelInfo::supports_generation) {
            tracing::warn!("No model supporting generateContent was listed");
            println!("Warning: no chat-capable model is available to this key");
        }

        Ok(())
    }
}

fn describe_model(model: &ModelInfo) -> String {
    let mut tags = Vec::new();
    if model.supports_generation() {
        tags.push("chat");
    }
    if model.supports_embedding() {
        tags.push("embeddings");
    }

    let name = model.name.trim_start_matches("models/");
    if tags.is_empty() {
        name.to_string()
    } else {
        format!("{} [{}]", name, tags.join(", "))
    }
}
