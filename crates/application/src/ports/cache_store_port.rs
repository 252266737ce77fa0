//! Durable cache storage port
//!
//! The memoizing client keeps its working set in memory and hands the whole
//! snapshot to a `CacheStorePort` after every mutation. Implementations decide
//! where the bytes live (a JSON file, or nowhere at all for tests).

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Fingerprint, GenerationOutput, ModelId};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::ApplicationError;

/// On-disk format version written by this build
pub const SNAPSHOT_VERSION: u32 = 1;

/// One memoized generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Fingerprint of the request that produced this entry
    pub key: Fingerprint,
    /// Stored response, returned verbatim on every hit
    pub value: GenerationOutput,
    /// When the live call completed
    pub created_at: DateTime<Utc>,
    /// Wall-clock duration of the live call
    pub original_latency_ms: u64,
    /// Model the request named
    pub model: ModelId,
}

/// Full cache contents as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub version: u32,
    #[serde(default)]
    pub entries: BTreeMap<Fingerprint, CacheEntry>,
}

impl Default for CacheSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl CacheSnapshot {
    /// Create an empty snapshot at the current version
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this build can read the snapshot
    pub const fn is_supported(&self) -> bool {
        self.version == SNAPSHOT_VERSION
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by fingerprint
    pub fn get(&self, key: &Fingerprint) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Insert an entry under its own key, replacing any previous one
    pub fn insert(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Size of the snapshot once serialized
    pub fn serialized_len(&self) -> Result<u64, ApplicationError> {
        serde_json::to_vec(self)
            .map(|bytes| bytes.len() as u64)
            .map_err(|e| ApplicationError::Persistence(format!("Snapshot serialization error: {e}")))
    }
}

/// Port for durable cache storage
///
/// `save` must be atomic: after it returns, a later `load` observes either
/// the previous snapshot or the new one, never a mix.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CacheStorePort: Send + Sync + std::fmt::Debug {
    /// Read the persisted snapshot
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet and an error
    /// when storage exists but cannot be read or parsed.
    async fn load(&self) -> Result<Option<CacheSnapshot>, ApplicationError>;

    /// Replace the persisted snapshot
    async fn save(&self, snapshot: &CacheSnapshot) -> Result<(), ApplicationError>;

    /// Overwrite storage with an empty snapshot
    async fn clear(&self) -> Result<(), ApplicationError>;

    /// Human-readable storage location
    fn location(&self) -> String;

    /// Size of the persisted snapshot, if one exists
    async fn size_bytes(&self) -> Option<u64>;
}
