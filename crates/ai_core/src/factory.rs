//! Engine construction from configuration

use std::sync::Arc;

use tracing::debug;

use crate::config::{InferenceBackend, InferenceConfig};
use crate::error::InferenceError;
use crate::ollama::OllamaInferenceEngine;
use crate::openai::OpenAiCompatibleEngine;
use crate::ports::InferenceEngine;

/// Build the engine the config's `backend` names
pub fn create_engine(config: InferenceConfig) -> Result<Arc<dyn InferenceEngine>, InferenceError> {
    debug!(backend = ?config.backend, "Creating inference engine");
    match config.backend {
        InferenceBackend::Ollama => Ok(Arc::new(OllamaInferenceEngine::new(config)?)),
        InferenceBackend::OpenAiCompatible => Ok(Arc::new(OpenAiCompatibleEngine::new(config)?)),
    }
}
