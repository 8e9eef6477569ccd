//! Index manifest (`manifest.json`).

use crate::embeddings::config::format_identity;
use chrono::{DateTime, Utc};
use securerag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Current on-disk layout version.
pub const FORMAT_VERSION: u32 = 1;

/// Similarity metric recorded in every manifest.
pub const METRIC_COSINE: &str = "cosine";

/// Describes a persisted index: how it was embedded and what it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub metric: String,
    pub normalized: bool,
    pub chunk_count: usize,
    pub document_count: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    /// Identity of the embedding space, comparable with
    /// [`EmbeddingConfig::identity`](crate::embeddings::EmbeddingConfig::identity).
    pub fn embedding_identity(&self) -> String {
        format_identity(&self.embedding_provider, &self.embedding_model, self.dimensions)
    }

    /// Read the manifest from an index directory.
    ///
    /// A missing or unparsable manifest means there is no usable index here.
    pub fn read(dir: &Path) -> AppResult<Self> {
        let path = dir.join(MANIFEST_FILE);

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            tracing::debug!("Cannot read manifest {:?}: {}", path, e);
            AppError::IndexNotFound(dir.to_path_buf())
        })?;

        let manifest: Self = serde_json::from_str(&contents).map_err(|e| {
            tracing::warn!("Ignoring invalid manifest {:?}: {}", path, e);
            AppError::IndexNotFound(dir.to_path_buf())
        })?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(AppError::CorruptIndex(format!(
                "unsupported index format version {} (expected {})",
                manifest.format_version, FORMAT_VERSION
            )));
        }

        Ok(manifest)
    }

    /// Write the manifest into an index directory.
    pub fn write(&self, dir: &Path) -> AppResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(MANIFEST_FILE), json)
            .map_err(|e| AppError::IndexWrite(format!("Failed to write manifest: {}", e)))
    }
}

#[cfg(test)]
pub(crate) fn sample_manifest(dimensions: usize, chunk_count: usize) -> IndexManifest {
    IndexManifest {
        format_version: FORMAT_VERSION,
        embedding_provider: "mock".to_string(),
        embedding_model: "trigram-v1".to_string(),
        dimensions,
        metric: METRIC_COSINE.to_string(),
        normalized: true,
        chunk_count,
        document_count: 1,
        chunk_size: 1000,
        chunk_overlap: 150,
        built_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = sample_manifest(8, 3);

        manifest.write(temp_dir.path()).unwrap();
        let loaded = IndexManifest::read(temp_dir.path()).unwrap();

        assert_eq!(loaded, manifest);
        assert_eq!(loaded.embedding_identity(), "mock:trigram-v1 (8 dims)");
    }

    #[test]
    fn test_missing_manifest_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            IndexManifest::read(temp_dir.path()),
            Err(AppError::IndexNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_manifest_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(MANIFEST_FILE), "{ nope").unwrap();

        assert!(matches!(
            IndexManifest::read(temp_dir.path()),
            Err(AppError::IndexNotFound(_))
        ));
    }

    #[test]
    fn test_future_format_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = IndexManifest {
            format_version: FORMAT_VERSION + 1,
            ..sample_manifest(8, 0)
        };
        manifest.write(temp_dir.path()).unwrap();

        assert!(matches!(
            IndexManifest::read(temp_dir.path()),
            Err(AppError::CorruptIndex(_))
        ));
    }
}
