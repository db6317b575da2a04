//! advisor-llm
//!
//! Chat client for a local Ollama server, used to phrase answers from the
//! reranked context.
pub mod ollama;

pub use ollama::{LlmError, OllamaGenerator};
