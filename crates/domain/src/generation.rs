//! Generation request and output
//!
//! A `GenerationRequest` is what the memoizing client fingerprints and what
//! an inference engine executes. A `GenerationOutput` is the payload stored
//! in the cache for that fingerprint.

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{Fingerprint, GenerationOptions, ModelId, Prompt};

/// A single text-generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// User prompt
    pub prompt: Prompt,
    /// Model to run the prompt against
    pub model: ModelId,
    /// Sampling options
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Create a request from validated parts
    pub const fn new(prompt: Prompt, model: ModelId, options: GenerationOptions) -> Self {
        Self {
            prompt,
            model,
            options,
        }
    }

    /// Validate raw inputs and build a request
    pub fn parse(
        prompt: impl Into<String>,
        model: impl Into<String>,
        options: GenerationOptions,
    ) -> Result<Self, DomainError> {
        let prompt = Prompt::new(prompt)?;
        let model = ModelId::new(model)?;
        options.validate()?;
        Ok(Self::new(prompt, model, options))
    }

    /// Cache key for this request
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

/// Token usage statistics reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Build usage from prompt and completion counts
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Response payload of a generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Generated text
    pub text: String,
    /// Model name as reported by the backend
    pub model: String,
    /// Token usage, when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl GenerationOutput {
    /// Create an output without usage data
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            usage: None,
        }
    }

    /// Attach token usage
    #[must_use]
    pub const fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}
