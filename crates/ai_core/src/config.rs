//! Configuration for inference engines

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Which wire dialect the backend speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceBackend {
    /// Ollama native API (`/api/generate`, `/api/tags`)
    #[default]
    Ollama,
    /// OpenAI-compatible API (`/chat/completions`, `/models`), e.g. Groq
    #[serde(alias = "groq", alias = "openai")]
    OpenAiCompatible,
}

/// Configuration for an inference engine
#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Wire dialect of the backend
    #[serde(default)]
    pub backend: InferenceBackend,

    /// Base URL of the inference server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default model to use
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Bearer key (Groq, Ollama Cloud)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("timeout_ms", &self.timeout_ms)
            .field(
                "api_key",
                &if self.api_key.is_some() {
                    Some("[REDACTED]")
                } else {
                    None
                },
            )
            .finish()
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3".to_string()
}

const fn default_timeout_ms() -> u64 {
    60000 // 60 seconds
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            backend: InferenceBackend::default(),
            base_url: default_base_url(),
            default_model: default_model(),
            timeout_ms: default_timeout_ms(),
            api_key: None,
        }
    }
}

impl InferenceConfig {
    /// Local Ollama server with a small Llama model
    pub fn ollama_local() -> Self {
        Self {
            default_model: "llama3.2:3b".to_string(),
            ..Default::default()
        }
    }

    /// Ollama Cloud; requires an API key
    pub fn ollama_cloud(api_key: SecretString) -> Self {
        Self {
            base_url: "https://ollama.com".to_string(),
            default_model: "gpt-oss:120b".to_string(),
            api_key: Some(api_key),
            ..Default::default()
        }
    }

    /// Groq's OpenAI-compatible endpoint
    pub fn groq(api_key: SecretString) -> Self {
        Self {
            backend: InferenceBackend::OpenAiCompatible,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            default_model: "llama-3.3-70b-versatile".to_string(),
            timeout_ms: 30000,
            api_key: Some(api_key),
        }
    }

    /// Base URL without a trailing slash
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
