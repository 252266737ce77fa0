//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod cache_store_port;

#[cfg(test)]
pub use cache_store_port::MockCacheStorePort;
pub use cache_store_port::{CacheEntry, CacheSnapshot, CacheStorePort, SNAPSHOT_VERSION};
