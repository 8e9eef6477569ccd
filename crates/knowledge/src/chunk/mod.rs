//! Document chunking.
//!
//! Splits each document with the [`RecursiveSplitter`] and stamps every
//! piece with the parent's title, category and permission set.

mod splitter;

pub use splitter::RecursiveSplitter;

use crate::types::{Chunk, ChunkMetadata, SourceDocument};
use sha2::{Digest, Sha256};

/// Split one document into chunks carrying its metadata.
pub fn chunk_document(
    document: &SourceDocument,
    document_index: usize,
    splitter: &RecursiveSplitter,
) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = splitter
        .split(&document.content)
        .into_iter()
        .enumerate()
        .map(|(ordinal, text)| Chunk {
            id: chunk_id(&document.title, ordinal, &text),
            document_index,
            source_ordinal: ordinal,
            text,
            metadata: ChunkMetadata {
                title: document.title.clone(),
                category: document.category.clone(),
                permission: Some(document.permission.clone()),
            },
        })
        .collect();

    if chunks.is_empty() {
        tracing::debug!("Document '{}' has no content to chunk", document.title);
    }

    chunks
}

/// Deterministic chunk identifier: SHA-256 over title, ordinal and text.
pub fn chunk_id(title: &str, ordinal: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(ordinal.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PermissionSet;

    fn document(content: &str) -> SourceDocument {
        SourceDocument {
            title: "Remote Work Policy".to_string(),
            content: content.to_string(),
            category: "HR".to_string(),
            permission: PermissionSet::new(["Engineer", "HR", "PM"]),
        }
    }

    #[test]
    fn test_chunks_inherit_metadata() {
        let splitter = RecursiveSplitter::new(40, 10).unwrap();
        let doc = document(&"Employees may work remotely two days a week. ".repeat(5));

        let chunks = chunk_document(&doc, 3, &splitter);
        assert!(chunks.len() > 1);

        for (ordinal, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.source_ordinal, ordinal);
            assert_eq!(chunk.document_index, 3);
            assert_eq!(chunk.metadata.title, "Remote Work Policy");
            assert_eq!(chunk.metadata.category, "HR");
            assert_eq!(chunk.metadata.permission.as_ref(), Some(&doc.permission));
        }
    }

    #[test]
    fn test_empty_content_yields_no_chunks() {
        let splitter = RecursiveSplitter::new(1000, 150).unwrap();
        assert!(chunk_document(&document(""), 0, &splitter).is_empty());
    }

    #[test]
    fn test_chunk_id_is_deterministic() {
        let id = chunk_id("Bonus Policy", 0, "Paid yearly.");
        assert_eq!(id.len(), 64);
        assert_eq!(id, chunk_id("Bonus Policy", 0, "Paid yearly."));
        assert_ne!(id, chunk_id("Bonus Policy", 1, "Paid yearly."));
        assert_ne!(id, chunk_id("Deployment Guide", 0, "Paid yearly."));
    }
}
