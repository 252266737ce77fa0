//! AI Core - Remote text generation backends
//!
//! Defines the `InferenceEngine` port the memoizing client calls through,
//! and two HTTP implementations: Ollama's native `/api/generate` endpoint
//! (local or Ollama Cloud) and OpenAI-compatible chat completions (Groq).

pub mod config;
pub mod error;
pub mod factory;
pub mod ollama;
pub mod openai;
pub mod ports;

pub use config::{InferenceBackend, InferenceConfig};
pub use error::InferenceError;
pub use factory::create_engine;
pub use ollama::OllamaInferenceEngine;
pub use openai::OpenAiCompatibleEngine;
pub use ports::InferenceEngine;
