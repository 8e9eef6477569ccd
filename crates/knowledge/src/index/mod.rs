//! Persisted vector index.
//!
//! An index is a directory holding `manifest.json` and `index.sqlite`. It is
//! written into a staging sibling and swapped into place, so readers see
//! either the previous index or the new one.

mod flat;
mod manifest;
mod store;

pub use flat::{cosine_similarity, FlatIndex};
pub use manifest::{IndexManifest, FORMAT_VERSION, MANIFEST_FILE, METRIC_COSINE};
pub use store::{bytes_to_embedding, embedding_to_bytes, DATABASE_FILE};

#[cfg(test)]
pub(crate) use manifest::sample_manifest;

use crate::types::VectorIndexEntry;
use securerag_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// An index that has been written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedIndex {
    pub location: PathBuf,
    pub manifest: IndexManifest,
}

/// Write an index to `target`, replacing any previous index there.
///
/// On error the previous index is left untouched.
pub fn persist_index(
    target: &Path,
    manifest: &IndexManifest,
    entries: &[VectorIndexEntry],
) -> AppResult<PersistedIndex> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::IndexWrite(format!("Invalid index location {:?}", target)))?;

    std::fs::create_dir_all(&parent).map_err(|e| {
        AppError::IndexWrite(format!("Failed to create directory {:?}: {}", parent, e))
    })?;

    let staging = parent.join(format!(".{}.staging-{}", name, uuid::Uuid::new_v4()));
    if let Err(e) = write_directory(&staging, manifest, entries) {
        remove_quietly(&staging);
        return Err(e);
    }

    if let Err(e) = swap_into_place(&staging, target, &parent, name) {
        remove_quietly(&staging);
        return Err(e);
    }

    tracing::info!(
        "Persisted index with {} chunks to {:?}",
        manifest.chunk_count,
        target
    );

    Ok(PersistedIndex {
        location: target.to_path_buf(),
        manifest: manifest.clone(),
    })
}

/// Load an index directory into memory.
///
/// # Errors
/// * `IndexNotFound` - missing directory, not a directory, or no valid manifest
/// * `CorruptIndex` - manifest present but the entries cannot be read back
pub fn load_index(dir: &Path) -> AppResult<(IndexManifest, FlatIndex)> {
    if !dir.is_dir() {
        return Err(AppError::IndexNotFound(dir.to_path_buf()));
    }

    let manifest = IndexManifest::read(dir)?;
    let entries = store::read_entries(&dir.join(DATABASE_FILE), manifest.dimensions)?;

    if entries.len() != manifest.chunk_count {
        return Err(AppError::CorruptIndex(format!(
            "manifest lists {} chunks, database holds {}",
            manifest.chunk_count,
            entries.len()
        )));
    }

    tracing::info!(
        "Loaded index from {:?}: {} chunks, model {}",
        dir,
        entries.len(),
        manifest.embedding_identity()
    );

    Ok((manifest, FlatIndex::new(entries)))
}

fn write_directory(
    dir: &Path,
    manifest: &IndexManifest,
    entries: &[VectorIndexEntry],
) -> AppResult<()> {
    std::fs::create_dir(dir)
        .map_err(|e| AppError::IndexWrite(format!("Failed to create {:?}: {}", dir, e)))?;

    store::write_entries(&dir.join(DATABASE_FILE), entries)?;

    // Manifest last: a directory without one is never treated as an index.
    manifest.write(dir)
}

fn swap_into_place(staging: &Path, target: &Path, parent: &Path, name: &str) -> AppResult<()> {
    let previous = if target.exists() {
        let aside = parent.join(format!(".{}.previous-{}", name, uuid::Uuid::new_v4()));
        std::fs::rename(target, &aside).map_err(|e| {
            AppError::IndexWrite(format!("Failed to move previous index aside: {}", e))
        })?;
        Some(aside)
    } else {
        None
    };

    if let Err(e) = std::fs::rename(staging, target) {
        if let Some(aside) = &previous {
            if let Err(restore) = std::fs::rename(aside, target) {
                tracing::error!(
                    "Failed to restore previous index from {:?}: {}",
                    aside,
                    restore
                );
            }
        }
        return Err(AppError::IndexWrite(format!(
            "Failed to move new index into place: {}",
            e
        )));
    }

    if let Some(aside) = previous {
        remove_quietly(&aside);
    }

    Ok(())
}

fn remove_quietly(path: &Path) {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    if let Err(e) = result {
        if path.exists() {
            tracing::warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}
