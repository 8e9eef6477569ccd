//! Answer prompt for SecureRAG.
//!
//! This crate owns the prompt used to turn retrieved passages into an answer:
//! - YAML-based prompt definition with a built-in default
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{default_answer_prompt, load_answer_prompt, ANSWER_PROMPT_FILE};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
