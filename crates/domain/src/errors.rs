//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// Prompt text is empty or whitespace only
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    /// Model identifier is missing or malformed
    #[error("Invalid model identifier: {0}")]
    InvalidModel(String),

    /// A sampling option is out of range
    #[error("Invalid option {name}: {reason}")]
    InvalidOption { name: String, reason: String },

    /// Fingerprint string is not a valid digest
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Create an invalid option error
    pub fn invalid_option(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_option_creates_correct_error() {
        let err = DomainError::invalid_option("temperature", "must be finite");
        match err {
            DomainError::InvalidOption { name, reason } => {
                assert_eq!(name, "temperature");
                assert_eq!(reason, "must be finite");
            },
            _ => unreachable!("Expected InvalidOption error"),
        }
    }

    #[test]
    fn invalid_option_message() {
        let err = DomainError::invalid_option("top_p", "must be between 0 and 1");
        assert_eq!(
            err.to_string(),
            "Invalid option top_p: must be between 0 and 1"
        );
    }

    #[test]
    fn empty_prompt_message() {
        assert_eq!(
            DomainError::EmptyPrompt.to_string(),
            "Prompt must not be empty"
        );
    }

    #[test]
    fn invalid_model_message() {
        let err = DomainError::InvalidModel("''".to_string());
        assert_eq!(err.to_string(), "Invalid model identifier: ''");
    }
}
