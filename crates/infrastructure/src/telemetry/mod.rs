//! Tracing subscriber setup
//!
//! Console logging only: human-readable text or JSON lines, filtered by
//! `RUST_LOG` when set and by the configured directive otherwise.

mod logging;

pub use logging::{TelemetryError, build_filter, init_logging};
