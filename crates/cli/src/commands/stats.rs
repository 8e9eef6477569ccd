//! Stats command handler.

use clap::Args;
use securerag_core::{config::AppConfig, AppResult};
use securerag_knowledge::index::{load_index, DATABASE_FILE};

/// Show the index manifest
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let location = config.index_path();
        let (manifest, _) = load_index(&location)?;
        let db_size_bytes = std::fs::metadata(location.join(DATABASE_FILE))
            .map(|m| m.len())
            .unwrap_or(0);

        if self.json {
            let output = serde_json::json!({
                "location": location,
                "manifest": manifest,
                "dbSizeBytes": db_size_bytes,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Index: {}", location.display());
            println!("  Embedding: {}", manifest.embedding_identity());
            println!("  Documents: {}", manifest.document_count);
            println!("  Chunks: {}", manifest.chunk_count);
            println!(
                "  Chunking: {} chars, {} overlap",
                manifest.chunk_size, manifest.chunk_overlap
            );
            println!("  Metric: {} (normalized: {})", manifest.metric, manifest.normalized);
            println!("  Built: {}", manifest.built_at.to_rfc3339());
            println!("  DB size: {} bytes", db_size_bytes);
        }

        Ok(())
    }
}
