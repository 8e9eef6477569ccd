//! Embedding generation.
//!
//! Provider-agnostic embedding behind the [`EmbeddingProvider`] trait, with
//! batching, normalization and retry shared by every provider.

pub mod config;
pub mod provider;
pub mod providers;
pub mod retry;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, create_provider_from_env, EmbeddingProvider};

use futures::{StreamExt, TryStreamExt};
use securerag_core::{AppError, AppResult};

/// Batches in flight while indexing.
const CONCURRENT_BATCHES: usize = 2;

/// Embed `texts` in batches of `batch_size`, preserving input order.
///
/// Every vector is checked against the provider's dimensions and, when
/// `normalize` is set, scaled to unit length.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
    normalize: bool,
) -> AppResult<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(
        "Embedding {} texts using provider '{}' (model: {})",
        texts.len(),
        provider.provider_name(),
        provider.model_name()
    );

    let batches: Vec<Vec<Vec<f32>>> = futures::stream::iter(texts.chunks(batch_size.max(1)))
        .map(|batch| provider.embed_batch(batch))
        .buffered(CONCURRENT_BATCHES)
        .try_collect()
        .await?;

    let mut embeddings: Vec<Vec<f32>> = batches.into_iter().flatten().collect();

    if embeddings.len() != texts.len() {
        return Err(AppError::Embedding(format!(
            "Provider returned {} embeddings for {} texts",
            embeddings.len(),
            texts.len()
        )));
    }

    for embedding in &mut embeddings {
        check_dimensions(embedding, provider.dimensions())?;
        if normalize {
            l2_normalize(embedding);
        }
    }

    tracing::debug!(
        "Generated {} embeddings of dimension {}",
        embeddings.len(),
        provider.dimensions()
    );

    Ok(embeddings)
}

/// Fail when a vector does not have the expected length.
pub fn check_dimensions(embedding: &[f32], expected: usize) -> AppResult<()> {
    if embedding.len() != expected {
        return Err(AppError::Embedding(format!(
            "Unexpected embedding dimensions: got {}, expected {}",
            embedding.len(),
            expected
        )));
    }
    Ok(())
}

/// Scale a vector to unit length. Zero vectors are left alone.
pub fn l2_normalize(embedding: &mut [f32]) {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        embedding.iter_mut().for_each(|v| *v /= norm);
    }
}
