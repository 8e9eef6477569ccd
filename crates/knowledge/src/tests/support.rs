//! Shared fixtures for the scenario tests.

use crate::embeddings::EmbeddingConfig;
use crate::index::{persist_index, IndexManifest, FORMAT_VERSION, METRIC_COSINE};
use crate::indexer::{build_index_with, IndexerConfig};
use crate::retriever::Retriever;
use crate::types::{PermissionSet, SourceDocument, VectorIndexEntry};
use crate::EmbeddingProvider;
use chrono::Utc;
use securerag_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DIMENSIONS: usize = 3;

/// Embedder with hand-picked vectors.
///
/// A text gets the vector of the first key it contains, so tests control
/// the ranking exactly. Texts matching no key fail to embed.
#[derive(Debug, Clone)]
pub struct FixedEmbedder {
    model: String,
    table: Vec<(String, Vec<f32>)>,
}

impl FixedEmbedder {
    pub fn new(table: &[(&str, [f32; DIMENSIONS])]) -> Self {
        Self {
            model: "table-v1".to_string(),
            table: table
                .iter()
                .map(|(key, vector)| (key.to_string(), vector.to_vec()))
                .collect(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| {
                self.table
                    .iter()
                    .find(|(key, _)| text.contains(key.as_str()))
                    .map(|(_, vector)| vector.clone())
                    .ok_or_else(|| AppError::Embedding(format!("no vector for {:?}", text)))
            })
            .collect()
    }
}

/// Wraps a [`FixedEmbedder`] and stalls every call for `delay`.
#[derive(Debug)]
pub struct SlowEmbedder {
    pub inner: FixedEmbedder,
    pub delay: Duration,
}

#[async_trait::async_trait]
impl EmbeddingProvider for SlowEmbedder {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed_batch(texts).await
    }
}

/// Embedder whose every call fails.
#[derive(Debug)]
pub struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    fn model_name(&self) -> &str {
        "table-v1"
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::Embedding("service unreachable".to_string()))
    }
}

pub fn doc(title: &str, content: &str, roles: &[&str]) -> SourceDocument {
    SourceDocument {
        title: title.to_string(),
        content: content.to_string(),
        category: "Policy".to_string(),
        permission: PermissionSet::new(roles.iter().copied()),
    }
}

pub fn indexer_config(location: PathBuf) -> IndexerConfig {
    IndexerConfig {
        location,
        chunk_size: 1000,
        chunk_overlap: 150,
        embedding: EmbeddingConfig {
            batch_size: 2,
            ..EmbeddingConfig::mock(DIMENSIONS)
        },
    }
}

/// Build an index at `location` and open a retriever over it.
pub async fn build_and_open(
    location: &Path,
    docs: &[SourceDocument],
    embedder: FixedEmbedder,
) -> Retriever {
    build_index_with(docs, &indexer_config(location.to_path_buf()), &embedder)
        .await
        .unwrap();
    Retriever::with_provider(location, Path::new("/"), Arc::new(embedder)).unwrap()
}

/// Persist hand-made entries, bypassing the chunker.
pub fn persist_entries(location: &Path, embedder: &FixedEmbedder, entries: &[VectorIndexEntry]) {
    let manifest = IndexManifest {
        format_version: FORMAT_VERSION,
        embedding_provider: embedder.provider_name().to_string(),
        embedding_model: embedder.model_name().to_string(),
        dimensions: DIMENSIONS,
        metric: METRIC_COSINE.to_string(),
        normalized: true,
        chunk_count: entries.len(),
        document_count: entries.len(),
        chunk_size: 1000,
        chunk_overlap: 150,
        built_at: Utc::now(),
    };
    persist_index(location, &manifest, entries).unwrap();
}

pub fn titles<'a>(chunks: impl IntoIterator<Item = &'a crate::types::Chunk>) -> Vec<&'a str> {
    chunks
        .into_iter()
        .map(|c| c.metadata.title.as_str())
        .collect()
}
