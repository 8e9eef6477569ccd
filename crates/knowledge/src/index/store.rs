//! SQLite storage for index entries (`index.sqlite`).

use crate::types::{Chunk, ChunkMetadata, PermissionSet, VectorIndexEntry};
use rusqlite::{params, Connection, OpenFlags};
use securerag_core::{AppError, AppResult};
use std::path::Path;

pub const DATABASE_FILE: &str = "index.sqlite";

const SCHEMA: &str = r#"
CREATE TABLE chunks (
    row_id INTEGER PRIMARY KEY,
    id TEXT NOT NULL,
    document_index INTEGER NOT NULL,
    source_ordinal INTEGER NOT NULL,
    title TEXT NOT NULL,
    category TEXT NOT NULL,
    permission TEXT,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL
);
"#;

/// Write all entries into a new database file, in order.
pub fn write_entries(db_path: &Path, entries: &[VectorIndexEntry]) -> AppResult<()> {
    let write_err = |e: rusqlite::Error| AppError::IndexWrite(format!("SQLite: {}", e));

    let mut conn = Connection::open(db_path).map_err(write_err)?;
    conn.execute_batch(SCHEMA).map_err(write_err)?;

    let tx = conn.transaction().map_err(write_err)?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO chunks (row_id, id, document_index, source_ordinal, title, category, permission, text, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .map_err(write_err)?;

        for (row_id, entry) in entries.iter().enumerate() {
            let chunk = &entry.chunk;
            let permission = chunk
                .metadata
                .permission
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            stmt.execute(params![
                row_id as i64,
                chunk.id,
                chunk.document_index as i64,
                chunk.source_ordinal as i64,
                chunk.metadata.title,
                chunk.metadata.category,
                permission,
                chunk.text,
                embedding_to_bytes(&entry.embedding),
            ])
            .map_err(write_err)?;
        }
    }
    tx.commit().map_err(write_err)?;

    tracing::debug!("Wrote {} entries to {:?}", entries.len(), db_path);
    Ok(())
}

/// Read all entries back in insertion order.
///
/// Every embedding must have exactly `dimensions` components.
pub fn read_entries(db_path: &Path, dimensions: usize) -> AppResult<Vec<VectorIndexEntry>> {
    let corrupt = |e: rusqlite::Error| AppError::CorruptIndex(format!("{:?}: {}", db_path, e));

    if !db_path.is_file() {
        return Err(AppError::CorruptIndex(format!(
            "missing database file {:?}",
            db_path
        )));
    }

    let conn =
        Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(corrupt)?;

    let mut stmt = conn
        .prepare(
            "SELECT id, document_index, source_ordinal, title, category, permission, text, embedding
             FROM chunks ORDER BY row_id",
        )
        .map_err(corrupt)?;

    let rows = stmt
        .query_map([], |row| {
            Ok(RawRow {
                id: row.get(0)?,
                document_index: row.get(1)?,
                source_ordinal: row.get(2)?,
                title: row.get(3)?,
                category: row.get(4)?,
                permission: row.get(5)?,
                text: row.get(6)?,
                embedding: row.get(7)?,
            })
        })
        .map_err(corrupt)?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row.map_err(corrupt)?.into_entry(dimensions)?);
    }

    Ok(entries)
}

struct RawRow {
    id: String,
    document_index: i64,
    source_ordinal: i64,
    title: String,
    category: String,
    permission: Option<String>,
    text: String,
    embedding: Vec<u8>,
}

impl RawRow {
    fn into_entry(self, dimensions: usize) -> AppResult<VectorIndexEntry> {
        let embedding = bytes_to_embedding(&self.embedding)?;
        if embedding.len() != dimensions {
            return Err(AppError::CorruptIndex(format!(
                "chunk {} has {} dimensions, manifest says {}",
                self.id,
                embedding.len(),
                dimensions
            )));
        }

        let permission = self
            .permission
            .map(|json| {
                serde_json::from_str::<PermissionSet>(&json).map_err(|e| {
                    AppError::CorruptIndex(format!(
                        "chunk {} has unreadable permission: {}",
                        self.id, e
                    ))
                })
            })
            .transpose()?;

        Ok(VectorIndexEntry {
            embedding,
            chunk: Chunk {
                id: self.id,
                document_index: to_usize(self.document_index)?,
                source_ordinal: to_usize(self.source_ordinal)?,
                text: self.text,
                metadata: ChunkMetadata {
                    title: self.title,
                    category: self.category,
                    permission,
                },
            },
        })
    }
}

fn to_usize(value: i64) -> AppResult<usize> {
    usize::try_from(value)
        .map_err(|_| AppError::CorruptIndex(format!("negative position {}", value)))
}

/// Convert embedding vector to little-endian bytes for storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
pub fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::CorruptIndex(format!(
            "embedding blob of {} bytes is not a whole number of f32 values",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(title: &str, permission: Option<PermissionSet>, embedding: Vec<f32>) -> VectorIndexEntry {
        VectorIndexEntry {
            embedding,
            chunk: Chunk {
                id: format!("{}-0", title),
                document_index: 0,
                source_ordinal: 0,
                text: format!("{} text", title),
                metadata: ChunkMetadata {
                    title: title.to_string(),
                    category: "HR".to_string(),
                    permission,
                },
            },
        }
    }

    #[test]
    fn test_write_and_read_preserves_order_and_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join(DATABASE_FILE);

        let entries = vec![
            entry("Bonus Policy", Some(PermissionSet::new(["HR"])), vec![1.0, 0.0]),
            entry("Legacy Note", None, vec![0.0, 1.0]),
            entry("Sealed", Some(PermissionSet::default()), vec![0.5, 0.5]),
        ];
        write_entries(&db, &entries).unwrap();

        let loaded = read_entries(&db, 2).unwrap();
        assert_eq!(loaded, entries);
        assert!(loaded[1].chunk.metadata.permission.is_none());
    }

    #[test]
    fn test_dimension_mismatch_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join(DATABASE_FILE);
        write_entries(&db, &[entry("A", None, vec![1.0, 0.0, 0.0])]).unwrap();

        assert!(matches!(read_entries(&db, 2), Err(AppError::CorruptIndex(_))));
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join(DATABASE_FILE);
        std::fs::write(&db, b"definitely not sqlite, just some bytes padded out a bit").unwrap();

        assert!(matches!(read_entries(&db, 2), Err(AppError::CorruptIndex(_))));
    }

    #[test]
    fn test_bytes_round_trip() {
        let v = vec![0.25_f32, -1.5, 3.0];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&v)).unwrap(), v);
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
    }
}
