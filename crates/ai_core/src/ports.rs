//! Port definitions for inference engines
//!
//! The memoizing client treats the remote model as a black box reachable
//! through `InferenceEngine::generate`. Engines do not retry; retry policy,
//! if any, belongs above the cache.

use async_trait::async_trait;
use domain::{GenerationOutput, GenerationRequest};

use crate::error::InferenceError;

/// Port for remote text generation
#[async_trait]
pub trait InferenceEngine: Send + Sync + std::fmt::Debug {
    /// Run one generation to completion (non-streaming)
    async fn generate(&self, request: &GenerationRequest)
    -> Result<GenerationOutput, InferenceError>;

    /// Check if the inference server is reachable
    async fn health_check(&self) -> Result<bool, InferenceError>;

    /// List models the server offers
    async fn list_models(&self) -> Result<Vec<String>, InferenceError>;

    /// Model used when the caller does not name one
    fn default_model(&self) -> &str;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}
