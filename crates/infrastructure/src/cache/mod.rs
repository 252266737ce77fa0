//! Durable storage adapters for the response cache
//!
//! - `JsonFileCacheStore`: single JSON document, replaced atomically on save
//! - `InMemoryCacheStore`: process-local, for tests and `--no-persist` runs

mod in_memory_store;
mod json_file_store;

use std::sync::Arc;

use application::ports::CacheStorePort;

pub use in_memory_store::InMemoryCacheStore;
pub use json_file_store::JsonFileCacheStore;

use crate::config::CacheAppConfig;

/// Build the store the cache configuration asks for
pub fn open_store(config: &CacheAppConfig) -> Arc<dyn CacheStorePort> {
    if config.persist {
        Arc::new(JsonFileCacheStore::new(&config.path))
    } else {
        Arc::new(InMemoryCacheStore::new())
    }
}
