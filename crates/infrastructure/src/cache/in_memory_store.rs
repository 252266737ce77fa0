//! Process-local cache store

use application::{
    error::ApplicationError,
    ports::{CacheSnapshot, CacheStorePort},
};
use async_trait::async_trait;
use parking_lot::RwLock;

/// Store that keeps the last saved snapshot in memory
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    snapshot: RwLock<Option<CacheSnapshot>>,
}

impl InMemoryCacheStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorePort for InMemoryCacheStore {
    async fn load(&self) -> Result<Option<CacheSnapshot>, ApplicationError> {
        Ok(self.snapshot.read().clone())
    }

    async fn save(&self, snapshot: &CacheSnapshot) -> Result<(), ApplicationError> {
        *self.snapshot.write() = Some(snapshot.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), ApplicationError> {
        *self.snapshot.write() = Some(CacheSnapshot::new());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn size_bytes(&self) -> Option<u64> {
        None
    }
}
