//! Infrastructure layer - Adapters for external systems
//!
//! Implements the cache storage port (JSON file and in-memory), loads
//! layered configuration and installs the tracing subscriber.

pub mod cache;
pub mod config;
pub mod telemetry;

pub use cache::{InMemoryCacheStore, JsonFileCacheStore, open_store};
pub use config::{AppConfig, CacheAppConfig, LogFormat, LoggingConfig};
pub use telemetry::{TelemetryError, init_logging};
