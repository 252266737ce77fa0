//! Ollama inference engine
//!
//! Talks to Ollama's native `/api/generate` endpoint. Works against a local
//! server and against Ollama Cloud (bearer key).

mod client;

pub use client::OllamaInferenceEngine;
