//! Sampling options that influence a generation's output
//!
//! Every field here takes part in the request fingerprint. A field left as
//! `None` means "use the backend's default" and is fingerprinted as absent,
//! so `{}` and `{temperature: 0.7}` are different requests even when the
//! backend default happens to be 0.7.

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Requested shape of the model's reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Free-form text
    #[default]
    Text,
    /// A single JSON object
    Json,
}

impl ResponseFormat {
    /// Stable name used in fingerprints and wire requests
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Sampling and prompt options for a generation request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature (0.0 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling probability mass (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Upper bound on generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling seed for reproducible output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// System prompt sent ahead of the user prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Reply format
    #[serde(default)]
    pub response_format: ResponseFormat,
}

impl GenerationOptions {
    /// Create options with every field at its backend default
    pub fn new() -> Self {
        Self::default()
    }

    /// Set temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top-p
    #[must_use]
    pub const fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the token limit
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Request a JSON object reply
    #[must_use]
    pub const fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    /// Check ranges of the numeric options
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(t) = self.temperature
            && (!t.is_finite() || !(0.0..=2.0).contains(&t))
        {
            return Err(DomainError::invalid_option(
                "temperature",
                format!("{t} is outside 0.0..=2.0"),
            ));
        }
        if let Some(p) = self.top_p
            && (!p.is_finite() || !(0.0..=1.0).contains(&p))
        {
            return Err(DomainError::invalid_option(
                "top_p",
                format!("{p} is outside 0.0..=1.0"),
            ));
        }
        if self.max_tokens == Some(0) {
            return Err(DomainError::invalid_option(
                "max_tokens",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Canonical temperature text, exact to the bit
    pub fn temperature_key(&self) -> Option<String> {
        self.temperature.map(float_key)
    }

    /// Canonical top-p text, exact to the bit
    pub fn top_p_key(&self) -> Option<String> {
        self.top_p.map(float_key)
    }
}

/// Engines send the value unrounded, so the key keeps every bit
fn float_key(value: f32) -> String {
    // `-0.0 + 0.0` is `+0.0`; every other value is unchanged
    let value = value + 0.0;
    format!("{:08x}", value.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_leaves_everything_to_backend() {
        let options = GenerationOptions::default();
        assert!(options.temperature.is_none());
        assert!(options.top_p.is_none());
        assert!(options.max_tokens.is_none());
        assert!(options.seed.is_none());
        assert!(options.system_prompt.is_none());
        assert_eq!(options.response_format, ResponseFormat::Text);
    }

    #[test]
    fn builder_chaining() {
        let options = GenerationOptions::new()
            .with_temperature(0.3)
            .with_top_p(0.9)
            .with_max_tokens(150)
            .with_seed(42)
            .with_system_prompt("You are terse")
            .json();
        assert_eq!(options.temperature, Some(0.3));
        assert_eq!(options.top_p, Some(0.9));
        assert_eq!(options.max_tokens, Some(150));
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.system_prompt.as_deref(), Some("You are terse"));
        assert_eq!(options.response_format, ResponseFormat::Json);
    }

    #[test]
    fn validate_accepts_bounds() {
        let options = GenerationOptions::new().with_temperature(0.0).with_top_p(1.0);
        assert!(options.validate().is_ok());
        let options = GenerationOptions::new().with_temperature(2.0).with_top_p(0.0);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_temperature() {
        let err = GenerationOptions::new()
            .with_temperature(2.5)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn validate_rejects_nan_temperature() {
        assert!(
            GenerationOptions::new()
                .with_temperature(f32::NAN)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn validate_rejects_out_of_range_top_p() {
        assert!(GenerationOptions::new().with_top_p(1.5).validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_max_tokens() {
        assert!(
            GenerationOptions::new()
                .with_max_tokens(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn temperature_key_is_exact() {
        let a = GenerationOptions::new().with_temperature(0.701);
        let b = GenerationOptions::new().with_temperature(0.704);
        let c = GenerationOptions::new().with_temperature(0.7001);
        let d = GenerationOptions::new().with_temperature(0.7);
        assert_ne!(a.temperature_key(), b.temperature_key());
        assert_ne!(c.temperature_key(), d.temperature_key());
        assert_eq!(
            d.temperature_key(),
            GenerationOptions::new().with_temperature(0.7).temperature_key()
        );
    }

    #[test]
    fn negative_zero_keys_like_zero() {
        let pos = GenerationOptions::new().with_temperature(0.0).with_top_p(0.0);
        let neg = GenerationOptions::new().with_temperature(-0.0).with_top_p(-0.0);
        assert_eq!(pos.temperature_key(), neg.temperature_key());
        assert_eq!(pos.top_p_key(), neg.top_p_key());
    }

    #[test]
    fn serialization_skips_unset_fields() {
        let json = serde_json::to_string(&GenerationOptions::default()).unwrap();
        assert_eq!(json, r#"{"response_format":"text"}"#);
    }

    #[test]
    fn deserialization_with_defaults() {
        let options: GenerationOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, GenerationOptions::default());
    }
}
