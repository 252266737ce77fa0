//! Request fingerprint used as the cache key
//!
//! A fingerprint is a blake3 digest over every request field that can change
//! the model's output: prompt, model, temperature, top-p, token limit, seed,
//! system prompt and response format. Fields are written length-prefixed and
//! tagged, so `("a|b", "")` and `("a", "b")` never collide.
//!
//! ```
//! use domain::{Fingerprint, GenerationOptions, GenerationRequest, ModelId, Prompt};
//!
//! let request = GenerationRequest::new(
//!     Prompt::new("Capital of India?").unwrap(),
//!     ModelId::new("model-a").unwrap(),
//!     GenerationOptions::default(),
//! );
//! let warmer = GenerationRequest::new(
//!     Prompt::new("Capital of India?").unwrap(),
//!     ModelId::new("model-a").unwrap(),
//!     GenerationOptions::new().with_temperature(0.9),
//! );
//! assert_eq!(Fingerprint::of(&request), Fingerprint::of(&request));
//! assert_ne!(Fingerprint::of(&request), Fingerprint::of(&warmer));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::generation::GenerationRequest;

/// Bumped whenever the set or encoding of fingerprinted fields changes
const SCHEME: &[u8] = b"llm-memo/fingerprint/v1";

/// Hex-encoded blake3 digest (64 lowercase hex characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a request
    pub fn of(request: &GenerationRequest) -> Self {
        let options = &request.options;
        let mut hasher = blake3::Hasher::new();
        hasher.update(SCHEME);
        write_field(&mut hasher, b"model", Some(request.model.as_str()));
        write_field(&mut hasher, b"prompt", Some(request.prompt.as_str()));
        write_field(
            &mut hasher,
            b"system",
            options.system_prompt.as_deref(),
        );
        write_field(
            &mut hasher,
            b"temperature",
            options.temperature_key().as_deref(),
        );
        write_field(&mut hasher, b"top_p", options.top_p_key().as_deref());
        write_field(
            &mut hasher,
            b"max_tokens",
            options.max_tokens.map(|n| n.to_string()).as_deref(),
        );
        write_field(
            &mut hasher,
            b"seed",
            options.seed.map(|n| n.to_string()).as_deref(),
        );
        write_field(
            &mut hasher,
            b"format",
            Some(options.response_format.as_str()),
        );
        Self(hasher.finalize().to_hex().to_string())
    }

    /// Parse a stored fingerprint
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let valid = s.len() == 64
            && s
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(DomainError::InvalidFingerprint(s.to_string()))
        }
    }

    /// Full hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated digest for log lines
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

/// Tag, presence byte, little-endian length, bytes
fn write_field(hasher: &mut blake3::Hasher, tag: &[u8], value: Option<&str>) {
    hasher.update(&(tag.len() as u64).to_le_bytes());
    hasher.update(tag);
    match value {
        Some(v) => {
            hasher.update(&[1]);
            hasher.update(&(v.len() as u64).to_le_bytes());
            hasher.update(v.as_bytes());
        },
        None => {
            hasher.update(&[0]);
        },
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}
