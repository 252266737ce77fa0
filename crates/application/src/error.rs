//! Application-level errors

use ai_core::InferenceError;
use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Caller input failed validation; nothing was attempted
    #[error("Validation error: {0}")]
    Validation(#[from] DomainError),

    /// The remote generation call failed or timed out
    #[error("Remote call failed: {0}")]
    RemoteCall(#[from] InferenceError),

    /// Durable cache storage could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The model answered, but not in the shape the use case asked for
    #[error("Invalid model reply: {0}")]
    InvalidReply(String),
}

impl ApplicationError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteCall(e) => e.is_transient(),
            Self::Persistence(_) => true,
            Self::Validation(_) | Self::InvalidReply(_) => false,
        }
    }
}
