//! Retrieval-augmented answering.
//!
//! Glue between the permission-filtered retriever, the answer prompt and a
//! completion provider.

pub mod ask;
pub mod types;

pub use ask::{AnswerService, AnswerSettings};
pub use types::{AnswerOutcome, SourceRef, MAX_SNIPPET_LENGTH};
