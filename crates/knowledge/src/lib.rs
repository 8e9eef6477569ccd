//! Permission-aware retrieval over an internal document corpus.
//!
//! Offline, [`build_index`] chunks a corpus, embeds every chunk and persists
//! a vector index whose chunks carry the roles allowed to see them. Online,
//! a [`Retriever`] loads that index and returns only the nearest chunks the
//! requester's role may see. [`AnswerService`] feeds those chunks to a
//! completion provider.

pub mod chunk;
pub mod corpus;
pub mod embeddings;
pub mod index;
pub mod indexer;
pub mod rag;
pub mod retriever;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use corpus::{load_corpus, try_load_corpus};
pub use embeddings::{EmbeddingConfig, EmbeddingProvider};
pub use index::{load_index, IndexManifest, PersistedIndex};
pub use indexer::{build_index, build_index_with, IndexerConfig};
pub use rag::{AnswerOutcome, AnswerService, AnswerSettings, SourceRef};
pub use retriever::{filter_by_role, Retriever, DEFAULT_TOP_K};
pub use types::{
    Chunk, ChunkMetadata, CorpusLoad, PermissionSet, QueryContext, SkippedRecord,
    SourceDocument, VectorIndexEntry,
};
