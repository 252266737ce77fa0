//! Application layer - Use cases and orchestration
//!
//! Hosts the persistent memoizing client that sits between callers and a
//! remote inference engine, the storage port it persists through, and the
//! text analysis use case built on top of it.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
