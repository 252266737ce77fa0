//! Domain layer for llm-memo
//!
//! Contains the validated request vocabulary (prompt, model, sampling options),
//! the request fingerprint used as cache key, and domain errors.
//! This layer performs no I/O.

pub mod errors;
pub mod generation;
pub mod value_objects;

pub use errors::DomainError;
pub use generation::{GenerationOutput, GenerationRequest, TokenUsage};
pub use value_objects::*;
