//! Question answering over permission-filtered passages.
//!
//! Retrieves the passages the requester may see, renders the answer prompt
//! and asks the completion provider. `answer` always produces text: failures
//! are reported as the answer itself so a chat host never has to handle an
//! error.

use crate::embeddings::EmbeddingConfig;
use crate::rag::types::{AnswerOutcome, SourceRef};
use crate::retriever::Retriever;
use securerag_core::{AppConfig, AppResult};
use securerag_llm::{create_client, LlmClient, LlmRequest};
use securerag_prompt::{build_prompt, load_answer_prompt, PromptDefinition};
use std::sync::Arc;
use std::time::Duration;

/// Generation and retrieval knobs for [`AnswerService`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Candidates fetched before permission filtering
    pub top_k: usize,
}

impl AnswerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            top_k: config.retrieval.top_k,
        }
    }
}

/// Completion client plus the prompt it is driven with.
struct Generator {
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
}

/// Answers questions for a given role.
///
/// Built once at startup and shared; holds no per-request state.
pub struct AnswerService {
    retriever: Result<Arc<Retriever>, String>,
    generator: Result<Generator, String>,
    settings: AnswerSettings,
}

impl AnswerService {
    /// Assemble a service from its parts.
    ///
    /// `retriever` is `Err(reason)` when the index could not be loaded; the
    /// service then answers every question with that reason.
    pub fn new(
        retriever: Result<Arc<Retriever>, String>,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        settings: AnswerSettings,
    ) -> Self {
        Self {
            retriever,
            generator: Ok(Generator { llm, prompt }),
            settings,
        }
    }

    /// Build the service from application configuration.
    ///
    /// Never fails. A missing index, an unusable LLM configuration or an
    /// invalid prompt override leaves the service degraded, and every answer
    /// then reports the reason.
    pub fn from_config(config: &AppConfig) -> Self {
        let embedding = EmbeddingConfig::from(&config.embedding);
        let retriever =
            Retriever::initialize(&config.index.path, &embedding, &config.workspace)
                .map(|r| {
                    Arc::new(r.with_timeout(Duration::from_secs(config.retrieval.timeout_secs)))
                })
                .map_err(|e| {
                    tracing::error!("Retriever unavailable: {}", e);
                    e.to_string()
                });

        let generator = create_client(&config.llm)
            .and_then(|llm| {
                let prompt = load_answer_prompt(&config.workspace)?;
                Ok(Generator { llm, prompt })
            })
            .map_err(|e| {
                tracing::error!("Answer generation unavailable: {}", e);
                e.to_string()
            });

        Self {
            retriever,
            generator,
            settings: AnswerSettings::from_config(config),
        }
    }

    /// Whether both the index and the completion client are usable.
    pub fn is_available(&self) -> bool {
        self.retriever.is_ok() && self.generator.is_ok()
    }

    pub fn retriever(&self) -> Option<&Arc<Retriever>> {
        self.retriever.as_ref().ok()
    }

    /// Answer `query` for `role`.
    pub async fn answer(&self, query: &str, role: &str) -> String {
        self.answer_with_sources(query, role).await.answer
    }

    /// Answer `query` for `role`, keeping the passages used.
    #[tracing::instrument(skip(self, query, role), fields(role = %role))]
    pub async fn answer_with_sources(&self, query: &str, role: &str) -> AnswerOutcome {
        let retriever = match &self.retriever {
            Ok(retriever) => retriever,
            Err(reason) => {
                return AnswerOutcome::message(format!(
                    "Error: retrieval is unavailable: {}",
                    reason
                ))
            }
        };
        let generator = match &self.generator {
            Ok(generator) => generator,
            Err(reason) => {
                return AnswerOutcome::message(format!(
                    "Error: answer generation is unavailable: {}",
                    reason
                ))
            }
        };

        let scored = retriever
            .retrieve_scored(query, role, self.settings.top_k)
            .await;
        let passages: Vec<String> = scored.iter().map(|(chunk, _)| chunk.text.clone()).collect();

        tracing::debug!("Answering with {} passages", passages.len());

        match self.generate(generator, query, &passages).await {
            Ok(answer) => AnswerOutcome {
                answer,
                sources: scored
                    .iter()
                    .map(|(chunk, score)| SourceRef::from_chunk(chunk, *score))
                    .collect(),
            },
            Err(e) => {
                tracing::error!("Answer generation failed: {}", e);
                AnswerOutcome::message(format!("An error occurred while answering: {}", e))
            }
        }
    }

    async fn generate(
        &self,
        generator: &Generator,
        query: &str,
        passages: &[String],
    ) -> AppResult<String> {
        let built = build_prompt(&generator.prompt, query, passages)?;

        let mut request = LlmRequest::new(built.user, self.settings.model.clone())
            .with_temperature(self.settings.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = generator.llm.complete(&request).await?;

        tracing::info!(
            "Generated answer with {} ({} tokens)",
            response.model,
            response.usage.total_tokens
        );

        Ok(response.content)
    }
}
