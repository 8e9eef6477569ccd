//! Retrieve command handler.
//!
//! Prints the passages a role may see for a query, without generating an answer.

use clap::Args;
use securerag_core::{config::AppConfig, AppResult};
use securerag_knowledge::{EmbeddingConfig, Retriever, SourceRef, DEFAULT_TOP_K};
use std::time::Duration;

const DEFAULT_QUERY: &str = "What is the policy on remote work?";

/// Show the passages visible to a role
#[derive(Args, Debug)]
pub struct RetrieveCommand {
    /// Requester role (exact, case-sensitive)
    #[arg(short, long)]
    pub role: String,

    /// Query text
    #[arg(short, long, default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Candidates fetched before permission filtering
    #[arg(short, default_value_t = DEFAULT_TOP_K)]
    pub k: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RetrieveCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing retrieve command");
        tracing::debug!("Retrieve options: {:?}", self);

        let retriever = Retriever::initialize(
            &config.index.path,
            &EmbeddingConfig::from(&config.embedding),
            &config.workspace,
        )?
        .with_timeout(Duration::from_secs(config.retrieval.timeout_secs));

        let results = retriever.retrieve_scored(&self.query, &self.role, self.k).await;
        let sources: Vec<SourceRef> = results
            .iter()
            .map(|(chunk, score)| SourceRef::from_chunk(chunk, *score))
            .collect();

        if self.json {
            let output = serde_json::json!({
                "query": self.query,
                "role": self.role,
                "k": self.k,
                "results": sources,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        if sources.is_empty() {
            println!("No documents visible to role '{}' for this query.", self.role);
            return Ok(());
        }

        println!("{} passages visible to role '{}':", sources.len(), self.role);
        for (i, source) in sources.iter().enumerate() {
            println!();
            println!("{}. {} [{}] (score {:.3})", i + 1, source.title, source.category, source.score);
            println!("   Allowed roles: {}", source.allowed_roles.join(", "));
            println!("   {}", source.snippet);
        }

        Ok(())
    }
}
