//! Application configuration
//!
//! Layered with the `config` crate, later sources overriding earlier ones:
//! 1. built-in defaults
//! 2. `llm-memo.toml` in the working directory, or the file passed explicitly
//! 3. `LLM_MEMO__<SECTION>__<KEY>` environment variables
//!    (e.g. `LLM_MEMO__CACHE__PATH`, `LLM_MEMO__INFERENCE__BACKEND=groq`)
//!
//! `GROQ_API_KEY` fills `inference.api_key` when nothing else set it.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use ai_core::InferenceConfig;
use application::{AnalysisConfig, MemoizingConfig};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default configuration file name, looked up without extension
pub const DEFAULT_CONFIG_NAME: &str = "llm-memo";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "LLM_MEMO";

/// Fallback variable for the hosted API key
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

const fn default_true() -> bool {
    true
}

/// Response cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheAppConfig {
    /// Whether responses are memoized at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether the cache survives restarts (false keeps it in memory)
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Cache file location
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,

    /// Upper bound on one remote call, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("llm_cache.json")
}

const fn default_request_timeout_ms() -> u64 {
    60_000
}

impl Default for CacheAppConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            persist: true,
            path: default_cache_path(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl CacheAppConfig {
    /// Remote-call timeout as a Duration
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Client settings derived from this section
    #[must_use]
    pub const fn memoizing(&self) -> MemoizingConfig {
        MemoizingConfig {
            enabled: self.enabled,
            request_timeout: self.request_timeout(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,

    /// Filter directive (e.g., "info", "application=debug,ai_core=trace")
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_log_filter(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Inference backend
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Response cache
    #[serde(default)]
    pub cache: CacheAppConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Sentiment and translation settings
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// With `file = None` a missing `llm-memo.toml` is fine; an explicit
    /// file must exist.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut config = Self::load_from(file, Self::environment())?;
        config.apply_api_key_fallback(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Load with an explicit environment source
    pub fn load_from(
        file: Option<&Path>,
        environment: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config = config::Config::builder()
            // Start with defaults
            .set_default("inference.base_url", "http://localhost:11434")?
            .set_default("inference.default_model", "llama3.2:3b")?
            .set_default("cache.path", "llm_cache.json")?
            // Load from file if exists
            .add_source(file_source)
            // Override with environment variables (e.g., LLM_MEMO__CACHE__ENABLED)
            .add_source(environment)
            .build()?;

        config.try_deserialize()
    }

    /// Environment source for `LLM_MEMO__SECTION__KEY` variables
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    /// Use `key` as the API key when none is configured
    pub fn apply_api_key_fallback(&mut self, key: Option<String>) {
        if self.inference.api_key.is_some() {
            return;
        }
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            debug!("Using {API_KEY_ENV} as inference API key");
            self.inference.api_key = Some(SecretString::from(key));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ai_core::InferenceBackend;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::environment().source(Some(map))
    }

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("llm-memo.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    // Defaults

    #[test]
    fn defaults_without_file_or_env() {
        let config = AppConfig::load_from(None, env(&[])).unwrap();
        assert_eq!(config.inference.backend, InferenceBackend::Ollama);
        assert_eq!(config.inference.base_url, "http://localhost:11434");
        assert_eq!(config.inference.default_model, "llama3.2:3b");
        assert!(config.cache.enabled);
        assert!(config.cache.persist);
        assert_eq!(config.cache.path, PathBuf::from("llm_cache.json"));
        assert_eq!(config.cache.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.analysis.parallel);
    }

    #[test]
    fn memoizing_config_follows_cache_section() {
        let cache = CacheAppConfig {
            enabled: false,
            request_timeout_ms: 1500,
            ..CacheAppConfig::default()
        };
        let memo = cache.memoizing();
        assert!(!memo.enabled);
        assert_eq!(memo.request_timeout, Duration::from_millis(1500));
    }

    // File source

    #[test]
    fn file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[inference]
backend = "groq"
base_url = "https://api.groq.com/openai/v1"
default_model = "llama-3.3-70b-versatile"

[cache]
path = "/tmp/memo.json"
request_timeout_ms = 5000

[logging]
format = "json"
filter = "debug"

[analysis]
parallel = false

[analysis.sentiment]
temperature = 0.1
max_tokens = 100
"#,
        );

        let config = AppConfig::load_from(Some(&path), env(&[])).unwrap();
        assert_eq!(config.inference.backend, InferenceBackend::OpenAiCompatible);
        assert_eq!(config.inference.default_model, "llama-3.3-70b-versatile");
        assert_eq!(config.cache.path, PathBuf::from("/tmp/memo.json"));
        assert_eq!(config.cache.request_timeout_ms, 5000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter, "debug");
        assert!(!config.analysis.parallel);
        assert_eq!(config.analysis.sentiment.max_tokens, 100);
        assert_eq!(config.analysis.translation.max_tokens, 1000);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AppConfig::load_from(Some(&missing), env(&[])).is_err());
    }

    // Environment source

    #[test]
    fn environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[cache]\npath = \"from-file.json\"\n");

        let config = AppConfig::load_from(
            Some(&path),
            env(&[
                ("LLM_MEMO__CACHE__PATH", "from-env.json"),
                ("LLM_MEMO__CACHE__ENABLED", "false"),
                ("LLM_MEMO__INFERENCE__TIMEOUT_MS", "1234"),
            ]),
        )
        .unwrap();

        assert_eq!(config.cache.path, PathBuf::from("from-env.json"));
        assert!(!config.cache.enabled);
        assert_eq!(config.inference.timeout_ms, 1234);
    }

    #[test]
    fn api_key_from_environment_section() {
        let config =
            AppConfig::load_from(None, env(&[("LLM_MEMO__INFERENCE__API_KEY", "gsk-env")]))
                .unwrap();
        assert_eq!(
            config.inference.api_key.unwrap().expose_secret(),
            "gsk-env"
        );
    }

    // API key fallback

    #[test]
    fn fallback_fills_missing_key() {
        let mut config = AppConfig::default();
        config.apply_api_key_fallback(Some("gsk-fallback".to_string()));
        assert_eq!(
            config.inference.api_key.unwrap().expose_secret(),
            "gsk-fallback"
        );
    }

    #[test]
    fn fallback_never_overrides_configured_key() {
        let mut config = AppConfig::default();
        config.inference.api_key = Some(SecretString::from("configured"));
        config.apply_api_key_fallback(Some("gsk-fallback".to_string()));
        assert_eq!(
            config.inference.api_key.unwrap().expose_secret(),
            "configured"
        );
    }

    #[test]
    fn blank_fallback_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_api_key_fallback(Some("  ".to_string()));
        assert!(config.inference.api_key.is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.apply_api_key_fallback(Some("gsk-secret".to_string()));
        let debug = format!("{config:?}");
        assert!(!debug.contains("gsk-secret"));
    }

    #[test]
    fn log_format_display() {
        assert_eq!(LogFormat::Text.to_string(), "text");
        assert_eq!(LogFormat::Json.to_string(), "json");
    }
}
