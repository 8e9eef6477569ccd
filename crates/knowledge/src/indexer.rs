//! Offline index builder.
//!
//! Chunks the corpus, embeds every chunk and persists the result. Any
//! failure aborts the whole build and leaves the previous index in place.

use crate::chunk::{chunk_document, RecursiveSplitter};
use crate::embeddings::{
    create_provider_from_env, embed_in_batches, EmbeddingConfig, EmbeddingProvider,
};
use crate::index::{persist_index, IndexManifest, PersistedIndex, FORMAT_VERSION, METRIC_COSINE};
use crate::types::{Chunk, SourceDocument, VectorIndexEntry};
use chrono::Utc;
use securerag_core::{AppConfig, AppError, AppResult};
use std::path::PathBuf;
use std::time::Instant;

/// Everything the indexer needs to know.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Target index directory
    pub location: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding: EmbeddingConfig,
}

impl IndexerConfig {
    /// Derive indexer settings from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            location: config.index_path(),
            chunk_size: config.index.chunk_size,
            chunk_overlap: config.index.chunk_overlap,
            embedding: EmbeddingConfig::from(&config.embedding),
        }
    }
}

/// Build and persist an index, creating the embedding provider from config.
pub async fn build_index(
    documents: &[SourceDocument],
    config: &IndexerConfig,
) -> AppResult<PersistedIndex> {
    let provider = create_provider_from_env(&config.embedding)?;
    build_index_with(documents, config, provider.as_ref()).await
}

/// Build and persist an index using an existing provider.
#[tracing::instrument(skip(documents, config, provider), fields(documents = documents.len(), location = ?config.location))]
pub async fn build_index_with(
    documents: &[SourceDocument],
    config: &IndexerConfig,
    provider: &dyn EmbeddingProvider,
) -> AppResult<PersistedIndex> {
    let start = Instant::now();

    if documents.is_empty() {
        return Err(AppError::CorpusLoad("no documents to index".to_string()));
    }

    let splitter = RecursiveSplitter::new(config.chunk_size, config.chunk_overlap)?;

    let chunks: Vec<Chunk> = documents
        .iter()
        .enumerate()
        .flat_map(|(index, document)| chunk_document(document, index, &splitter))
        .collect();

    if chunks.is_empty() {
        return Err(AppError::CorpusLoad(
            "documents produced no chunks (all content empty)".to_string(),
        ));
    }

    tracing::info!(
        "Split {} documents into {} chunks (size {}, overlap {})",
        documents.len(),
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embed_in_batches(
        provider,
        &texts,
        config.embedding.batch_size,
        config.embedding.normalize,
    )
    .await?;

    let entries: Vec<VectorIndexEntry> = embeddings
        .into_iter()
        .zip(chunks)
        .map(|(embedding, chunk)| VectorIndexEntry { embedding, chunk })
        .collect();

    let manifest = IndexManifest {
        format_version: FORMAT_VERSION,
        embedding_provider: provider.provider_name().to_string(),
        embedding_model: provider.model_name().to_string(),
        dimensions: provider.dimensions(),
        metric: METRIC_COSINE.to_string(),
        normalized: config.embedding.normalize,
        chunk_count: entries.len(),
        document_count: documents.len(),
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
        built_at: Utc::now(),
    };

    let persisted = persist_index(&config.location, &manifest, &entries)?;

    tracing::info!(
        "Indexed {} documents ({} chunks) in {:.2}s",
        manifest.document_count,
        manifest.chunk_count,
        start.elapsed().as_secs_f64()
    );

    Ok(persisted)
}
