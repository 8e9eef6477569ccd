//! Index command handler.
//!
//! Loads a corpus file, builds the vector index and reports what was written.

use clap::Args;
use securerag_core::config::{resolve_path, AppConfig};
use securerag_core::AppResult;
use securerag_knowledge::{build_index, try_load_corpus, IndexerConfig};
use std::path::PathBuf;

/// Build the vector index from a corpus file
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// JSON corpus file (array of documents)
    #[arg(long)]
    pub corpus: PathBuf,

    /// Index directory (default: index.path from config)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command");
        tracing::debug!("Index options: {:?}", self);

        let corpus_path = resolve_path(&config.workspace, &self.corpus);
        let corpus = try_load_corpus(&corpus_path)?;

        let mut indexer = IndexerConfig::from_app_config(config);
        if let Some(out) = &self.out {
            indexer.location = resolve_path(&config.workspace, out);
        }

        let persisted = build_index(&corpus.documents, &indexer).await?;
        let manifest = &persisted.manifest;

        if self.json {
            let output = serde_json::json!({
                "location": persisted.location,
                "documents": manifest.document_count,
                "chunks": manifest.chunk_count,
                "embedding": manifest.embedding_identity(),
                "skipped": corpus.skipped,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Indexed {} documents into {} chunks", manifest.document_count, manifest.chunk_count);
            println!("  Location: {}", persisted.location.display());
            println!("  Embedding: {}", manifest.embedding_identity());
            if !corpus.skipped.is_empty() {
                println!("  Skipped {} records:", corpus.skipped.len());
                for skipped in &corpus.skipped {
                    println!(
                        "    #{} {}: {}",
                        skipped.index,
                        skipped.title.as_deref().unwrap_or("(untitled)"),
                        skipped.reason
                    );
                }
            }
        }

        Ok(())
    }
}
