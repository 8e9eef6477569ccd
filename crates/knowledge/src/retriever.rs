//! Permission-filtered retrieval.
//!
//! The retriever fetches the `k` most similar chunks and then drops every
//! chunk the requester's role may not see. Filtering happens after the
//! search, so a query returns between 0 and `k` chunks; nothing is
//! backfilled from further down the ranking.

use crate::embeddings::{
    create_provider_from_env, l2_normalize, EmbeddingConfig, EmbeddingProvider,
};
use crate::index::{load_index, FlatIndex, IndexManifest};
use crate::types::{Chunk, QueryContext};
use securerag_core::config::resolve_path;
use securerag_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default number of candidates fetched per query.
pub const DEFAULT_TOP_K: usize = 4;

/// Default deadline for embedding a query and searching.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only, shareable retriever over a loaded index.
#[derive(Debug)]
pub struct Retriever {
    location: PathBuf,
    manifest: IndexManifest,
    index: FlatIndex,
    provider: Arc<dyn EmbeddingProvider>,
    normalize: bool,
    timeout: Duration,
}

impl Retriever {
    /// Load the index at `index_location` (relative paths resolve against
    /// `base`) and build the query-time embedding provider.
    ///
    /// # Errors
    /// * `IndexNotFound` - no index at the location
    /// * `CorruptIndex` - the index cannot be read back
    /// * `ModelMismatch` - configured embedding model differs from the index
    /// * `EmbeddingInit` - the provider cannot be constructed
    pub fn initialize(
        index_location: &Path,
        embedding_config: &EmbeddingConfig,
        base: &Path,
    ) -> AppResult<Self> {
        let location = resolve_path(base, index_location);
        let (manifest, index) = load_index(&location)?;
        embedding_config.validate_consistency(&manifest)?;

        let provider = create_provider_from_env(embedding_config)?;

        Ok(Self::from_parts(location, manifest, index, provider))
    }

    /// Like [`Retriever::initialize`], with a caller-supplied provider.
    pub fn with_provider(
        index_location: &Path,
        base: &Path,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        let location = resolve_path(base, index_location);
        let (manifest, index) = load_index(&location)?;

        let configured = crate::embeddings::config::format_identity(
            provider.provider_name(),
            provider.model_name(),
            provider.dimensions(),
        );
        if configured != manifest.embedding_identity() {
            return Err(AppError::ModelMismatch {
                indexed: manifest.embedding_identity(),
                configured,
            });
        }

        Ok(Self::from_parts(location, manifest, index, provider))
    }

    fn from_parts(
        location: PathBuf,
        manifest: IndexManifest,
        index: FlatIndex,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            normalize: manifest.normalized,
            location,
            manifest,
            index,
            provider,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Set the query deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Number of chunks in the index.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Chunks visible to `role` among the `k` nearest to `query`.
    ///
    /// Never fails: embedding errors and timeouts are logged and yield an
    /// empty result.
    pub async fn retrieve(&self, query: &str, role: &str, k: usize) -> Vec<Chunk> {
        self.retrieve_scored(query, role, k)
            .await
            .into_iter()
            .map(|(chunk, _)| chunk)
            .collect()
    }

    /// Like [`Retriever::retrieve`], keeping similarity scores.
    pub async fn retrieve_scored(&self, query: &str, role: &str, k: usize) -> Vec<(Chunk, f32)> {
        self.retrieve_context(&QueryContext::new(query, role, k))
            .await
    }

    /// Run a retrieval request.
    #[tracing::instrument(skip(self, context), fields(role = %context.requester_role, k = context.k))]
    pub async fn retrieve_context(&self, context: &QueryContext) -> Vec<(Chunk, f32)> {
        let embedding = match self.embed_query_within_deadline(&context.query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::error!("Retrieval failed while embedding the query: {}", e);
                return Vec::new();
            }
        };

        let candidates = self.index.search(&embedding, context.k);
        let results = filter_by_role(
            candidates
                .into_iter()
                .map(|(entry, score)| (entry.chunk.clone(), score)),
            &context.requester_role,
        );

        tracing::info!(
            "Retrieved {} of {} candidates for role '{}'",
            results.len(),
            context.k.min(self.index.len()),
            context.requester_role
        );

        results
    }

    async fn embed_query_within_deadline(&self, query: &str) -> AppResult<Vec<f32>> {
        tokio::time::timeout(self.timeout, self.embed_query(query))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "query embedding exceeded {:.3}s",
                    self.timeout.as_secs_f64()
                ))
            })?
    }

    async fn embed_query(&self, query: &str) -> AppResult<Vec<f32>> {
        let mut embedding = self.provider.embed_query(query).await?;
        crate::embeddings::check_dimensions(&embedding, self.manifest.dimensions)?;
        if self.normalize {
            l2_normalize(&mut embedding);
        }
        Ok(embedding)
    }
}

/// Keep only candidates visible to `role`, preserving order.
///
/// A chunk without permission metadata is dropped with a warning; a chunk
/// whose set does not contain the role is dropped silently.
pub fn filter_by_role<I>(candidates: I, role: &str) -> Vec<(Chunk, f32)>
where
    I: IntoIterator<Item = (Chunk, f32)>,
{
    candidates
        .into_iter()
        .filter(|(chunk, _)| match &chunk.metadata.permission {
            None => {
                tracing::warn!(
                    chunk_id = %chunk.id,
                    title = %chunk.metadata.title,
                    "Chunk has no permission metadata; excluding"
                );
                false
            }
            Some(permission) if permission.allows(role) => true,
            Some(_) => {
                tracing::debug!(
                    chunk_id = %chunk.id,
                    "Access denied for role '{}' to '{}'",
                    role,
                    chunk.metadata.title
                );
                false
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkMetadata, PermissionSet};

    fn chunk(title: &str, permission: Option<Vec<&str>>) -> (Chunk, f32) {
        (
            Chunk {
                id: title.to_string(),
                document_index: 0,
                source_ordinal: 0,
                text: format!("{} text", title),
                metadata: ChunkMetadata {
                    title: title.to_string(),
                    category: "General".to_string(),
                    permission: permission.map(PermissionSet::new),
                },
            },
            0.5,
        )
    }

    #[test]
    fn test_filter_keeps_order_and_members_only() {
        let candidates = vec![
            chunk("Bonus Policy", Some(vec!["HR"])),
            chunk("Remote Work Policy", Some(vec!["Engineer", "HR", "PM"])),
            chunk("Deployment Guide", Some(vec!["Engineer"])),
            chunk("Salary Bands", Some(vec!["HR"])),
        ];

        let titles: Vec<String> = filter_by_role(candidates, "HR")
            .into_iter()
            .map(|(c, _)| c.metadata.title)
            .collect();
        assert_eq!(titles, vec!["Bonus Policy", "Remote Work Policy", "Salary Bands"]);
    }

    #[test]
    fn test_filter_drops_missing_and_empty_permissions() {
        let candidates = vec![
            chunk("Legacy", None),
            chunk("Sealed", Some(vec![])),
            chunk("Open", Some(vec!["PM"])),
        ];

        let kept = filter_by_role(candidates, "PM");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].0.metadata.title, "Open");
    }

    #[test]
    fn test_filter_is_exact() {
        let kept = filter_by_role(vec![chunk("Runbook", Some(vec!["Engineering"]))], "Eng");
        assert!(kept.is_empty());
    }
}
