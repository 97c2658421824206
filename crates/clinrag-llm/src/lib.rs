//! clinrag-llm
//!
//! `Generator` implementations. Only the Ollama chat API in JSON mode for now.
pub mod ollama;

pub use ollama::OllamaGenerator;
