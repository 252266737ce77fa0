//! Inference errors

use thiserror::Error;

/// Errors that can occur during a remote generation call
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Failed to connect to inference server
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request to inference server failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Model not found or not loaded
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Response parsing failed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Timeout during inference
    #[error("Inference timeout after {0}ms")]
    Timeout(u64),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Server error
    #[error("Server error: {0}")]
    ServerError(String),

    /// Engine is misconfigured (missing key, bad URL)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl InferenceError {
    /// Map a transport error, reporting timeouts with the configured budget
    pub fn from_reqwest(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_ms)
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }

    /// Map a non-success HTTP status
    pub fn from_status(status: reqwest::StatusCode, body: &str, model: &str) -> Self {
        match status.as_u16() {
            429 => Self::RateLimited,
            404 => Self::ModelNotAvailable(model.to_string()),
            _ => Self::ServerError(format!("Status {status}: {body}")),
        }
    }

    /// Whether a caller may reasonably retry
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::Timeout(_) | Self::RateLimited | Self::ServerError(_)
        )
    }
}
