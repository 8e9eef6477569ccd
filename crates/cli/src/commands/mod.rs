//! Command handlers for the SecureRAG CLI.

pub mod ask;
pub mod index;
pub mod models;
pub mod retrieve;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use index::IndexCommand;
pub use models::ModelsCommand;
pub use retrieve::RetrieveCommand;
pub use stats::StatsCommand;
