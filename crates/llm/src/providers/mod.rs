//! Completion provider implementations.

pub mod gemini;
pub mod ollama;

pub use gemini::{GeminiClient, ModelInfo};
pub use ollama::OllamaClient;
