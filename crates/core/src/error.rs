//! Error types for SecureRAG.
//!
//! One enum covers every failure category in the workspace: configuration,
//! corpus loading, embedding, index persistence, answer generation and
//! prompt rendering. Per-item conditions (a skipped corpus record, a chunk
//! without permission metadata) are reported through logs, not through this
//! type.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for SecureRAG.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The corpus file could not be opened or parsed
    #[error("Corpus load error: {0}")]
    CorpusLoad(String),

    /// The embedding provider could not be constructed (e.g. missing credential)
    #[error("Embedding init error: {0}")]
    EmbeddingInit(String),

    /// An embedding call failed (unreachable service, invalid credential, bad response)
    #[error("Embedding service error: {0}")]
    Embedding(String),

    /// No index exists at the given location
    #[error("Index not found at {0:?}")]
    IndexNotFound(PathBuf),

    /// An index exists but cannot be read back
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// The index could not be written or swapped into place
    #[error("Index write error: {0}")]
    IndexWrite(String),

    /// The query-time embedding model differs from the one used to build the index
    #[error("Embedding model mismatch: index built with '{indexed}', configured '{configured}'")]
    ModelMismatch { indexed: String, configured: String },

    /// Answer-generation provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// An external call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
