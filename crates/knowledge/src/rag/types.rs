//! Answer service response types.

use crate::types::Chunk;
use serde::{Deserialize, Serialize};

/// Maximum snippet length for source references.
pub const MAX_SNIPPET_LENGTH: usize = 150;

/// A passage the answer was grounded on.
///
/// Only chunks the requester was allowed to see ever become a `SourceRef`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// Title of the source document
    pub title: String,

    pub category: String,

    /// Leading text of the passage, truncated to [`MAX_SNIPPET_LENGTH`] characters
    pub snippet: String,

    /// Roles allowed to see the passage
    pub allowed_roles: Vec<String>,

    /// Cosine similarity to the query
    pub score: f32,
}

impl SourceRef {
    /// Describe a retrieved chunk.
    pub fn from_chunk(chunk: &Chunk, score: f32) -> Self {
        Self {
            title: chunk.metadata.title.clone(),
            category: chunk.metadata.category.clone(),
            snippet: truncate_snippet(&chunk.text, MAX_SNIPPET_LENGTH),
            allowed_roles: chunk
                .metadata
                .permission
                .as_ref()
                .map(|p| p.roles().map(str::to_string).collect())
                .unwrap_or_default(),
            score,
        }
    }
}

/// Answer text plus the passages it was built from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerOutcome {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

impl AnswerOutcome {
    /// An outcome that carries only a message.
    pub fn message(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
        }
    }
}

/// Truncate text to `max_chars` characters, adding an ellipsis when cut.
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }

    let mut snippet: String = trimmed.chars().take(max_chars).collect();
    snippet.push_str("...");
    snippet
}
