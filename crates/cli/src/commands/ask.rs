//! Ask command handler.
//!
//! Answers a question for a role from the passages that role may see.

use clap::Args;
use securerag_core::{config::AppConfig, AppResult};
use securerag_knowledge::AnswerService;

/// Ask a question as a given role
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Requester role (exact, case-sensitive)
    #[arg(short, long)]
    pub role: String,

    /// Output answer and sources as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    ///
    /// Retrieval and generation problems, including an unusable index or LLM
    /// configuration, are printed as the answer.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask options: {:?}", self);

        let service = AnswerService::from_config(config);
        let outcome = service.answer_with_sources(&self.question, &self.role).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            println!("{}", outcome.answer);
        }

        Ok(())
    }
}
