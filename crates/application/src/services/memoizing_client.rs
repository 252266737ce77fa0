//! Persistent memoizing client
//!
//! Wraps an [`InferenceEngine`] so that a generation is computed at most once
//! per request fingerprint and the result survives process restarts.
//!
//! Locking:
//! - `snapshot` (sync mutex) guards the in-memory entries and is never held
//!   across an await, so hits never wait on disk I/O.
//! - `writer` (async mutex) serializes durable writes. Each save copies the
//!   entries after taking it, so an older copy never lands after a newer one.
//! - `in_flight` hands out one async lock per fingerprint. Identical requests
//!   queue behind the first and then observe its entry; distinct requests run
//!   concurrently. Entries leave the map when their last user is dropped,
//!   cancelled callers included.
//!
//! Errors are never cached: a failed or timed-out remote call leaves the
//! store untouched.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use ai_core::{InferenceEngine, InferenceError};
use chrono::Utc;
use domain::{Fingerprint, GenerationOptions, GenerationOutput, GenerationRequest};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::ApplicationError,
    ports::{CacheEntry, CacheSnapshot, CacheStorePort},
};

/// Remote-call timeout when none is configured
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Runtime switches for the memoizing client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoizingConfig {
    /// When false every call goes to the engine and nothing is stored
    pub enabled: bool,
    /// Upper bound on a single remote call
    pub request_timeout: Duration,
}

impl Default for MemoizingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Result of [`PersistentMemoizingClient::get_response`]
#[derive(Debug, Clone, PartialEq)]
pub struct MemoizedResponse {
    /// Generated (or stored) response
    pub output: GenerationOutput,
    /// Time spent in this call; lookup only for hits, remote call for misses
    pub elapsed: Duration,
    /// True when the response came from the cache
    pub was_cached: bool,
    /// Cache key of the request
    pub fingerprint: Fingerprint,
    /// False when a fresh entry could not be written to durable storage
    pub persisted: bool,
}

impl MemoizedResponse {
    /// Split into `(response, elapsed, was_cached)`
    pub fn into_parts(self) -> (GenerationOutput, Duration, bool) {
        (self.output, self.elapsed, self.was_cached)
    }
}

/// Cache introspection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of stored entries
    pub entry_count: usize,
    /// Where the cache is persisted
    pub storage_path: String,
    /// Size of the persisted file, or of the serialized entries when nothing is on disk
    pub approx_size_bytes: u64,
    /// Hits served by this instance
    pub hits: u64,
    /// Misses (remote calls) made by this instance
    pub misses: u64,
}

impl CacheStats {
    /// Calculate the hit rate as a fraction (0.0 - 1.0)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

type FlightMap = parking_lot::Mutex<HashMap<Fingerprint, Flight>>;

#[derive(Debug, Default)]
struct Flight {
    gate: Arc<tokio::sync::Mutex<()>>,
    users: usize,
}

/// Registration in the single-flight map, removed with its last user
struct FlightGuard<'a> {
    map: &'a FlightMap,
    fingerprint: Fingerprint,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> FlightGuard<'a> {
    fn join(map: &'a FlightMap, fingerprint: &Fingerprint) -> Self {
        let gate = {
            let mut flights = map.lock();
            let flight = flights.entry(fingerprint.clone()).or_default();
            flight.users += 1;
            Arc::clone(&flight.gate)
        };
        Self {
            map,
            fingerprint: fingerprint.clone(),
            gate,
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut flights = self.map.lock();
        if let Some(flight) = flights.get_mut(&self.fingerprint) {
            flight.users = flight.users.saturating_sub(1);
            if flight.users == 0 {
                flights.remove(&self.fingerprint);
            }
        }
    }
}

/// Memoizing front for a remote inference engine
pub struct PersistentMemoizingClient {
    engine: Arc<dyn InferenceEngine>,
    store: Arc<dyn CacheStorePort>,
    config: MemoizingConfig,
    snapshot: parking_lot::Mutex<CacheSnapshot>,
    writer: tokio::sync::Mutex<()>,
    in_flight: FlightMap,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl fmt::Debug for PersistentMemoizingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentMemoizingClient")
            .field("engine", &self.engine.name())
            .field("storage", &self.store.location())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PersistentMemoizingClient {
    /// Open a client, loading whatever the store has persisted
    ///
    /// Missing, unreadable, corrupt or unknown-version storage yields an
    /// empty cache; the problem is logged and never returned.
    pub async fn open(
        engine: Arc<dyn InferenceEngine>,
        store: Arc<dyn CacheStorePort>,
        config: MemoizingConfig,
    ) -> Self {
        let snapshot = match store.load().await {
            Ok(Some(snapshot)) if snapshot.is_supported() => {
                info!(
                    entries = snapshot.len(),
                    location = %store.location(),
                    "Loaded response cache"
                );
                snapshot
            },
            Ok(Some(snapshot)) => {
                warn!(
                    version = snapshot.version,
                    location = %store.location(),
                    "Unsupported cache version, starting empty"
                );
                CacheSnapshot::new()
            },
            Ok(None) => {
                debug!(location = %store.location(), "No persisted cache, starting empty");
                CacheSnapshot::new()
            },
            Err(e) => {
                warn!(error = %e, location = %store.location(), "Failed to load cache, starting empty");
                CacheSnapshot::new()
            },
        };

        Self {
            engine,
            store,
            config,
            snapshot: parking_lot::Mutex::new(snapshot),
            writer: tokio::sync::Mutex::new(()),
            in_flight: parking_lot::Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Current configuration
    pub const fn config(&self) -> &MemoizingConfig {
        &self.config
    }

    /// Engine behind the cache
    pub fn engine(&self) -> &Arc<dyn InferenceEngine> {
        &self.engine
    }

    /// Return the response for a request, calling the engine only on a miss
    ///
    /// `options` of `None` means backend defaults.
    #[instrument(skip(self, prompt, options), fields(prompt_len = prompt.len()))]
    pub async fn get_response(
        &self,
        prompt: &str,
        model: &str,
        options: Option<GenerationOptions>,
    ) -> Result<MemoizedResponse, ApplicationError> {
        let request = GenerationRequest::parse(prompt, model, options.unwrap_or_default())?;
        let fingerprint = request.fingerprint();

        if !self.config.enabled {
            let started = Instant::now();
            let output = self.call_engine(&request).await?;
            return Ok(MemoizedResponse {
                output,
                elapsed: started.elapsed(),
                was_cached: false,
                fingerprint,
                persisted: false,
            });
        }

        if let Some(hit) = self.lookup(&fingerprint, Instant::now()) {
            return Ok(hit);
        }

        let flight = FlightGuard::join(&self.in_flight, &fingerprint);
        let _permit = flight.gate.lock().await;
        // Time spent queued behind an identical request is not lookup time
        if let Some(hit) = self.lookup(&fingerprint, Instant::now()) {
            return Ok(hit);
        }
        self.fill(request, fingerprint).await
    }

    /// Drop every entry and overwrite durable storage with an empty cache
    ///
    /// The in-memory cache is cleared even when the storage write fails.
    #[instrument(skip(self))]
    pub async fn clear_cache(&self) -> Result<(), ApplicationError> {
        let _writer = self.writer.lock().await;
        let removed = {
            let mut snapshot = self.snapshot.lock();
            let removed = snapshot.len();
            snapshot.clear();
            removed
        };
        self.store.clear().await?;
        info!(removed, "Cache cleared");
        Ok(())
    }

    /// Write the current entries to durable storage
    pub async fn flush(&self) -> Result<(), ApplicationError> {
        self.persist().await
    }

    /// Entry count, storage location, approximate size and hit counters
    pub async fn cache_stats(&self) -> CacheStats {
        let on_disk = self.store.size_bytes().await;
        let snapshot = self.snapshot.lock();
        let approx_size_bytes =
            on_disk.unwrap_or_else(|| snapshot.serialized_len().unwrap_or(0));
        CacheStats {
            entry_count: snapshot.len(),
            storage_path: self.store.location(),
            approx_size_bytes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Up to `n` fingerprints, in sorted order
    pub fn sample_keys(&self, n: usize) -> Vec<Fingerprint> {
        self.snapshot
            .lock()
            .entries
            .keys()
            .take(n)
            .cloned()
            .collect()
    }

    fn lookup(&self, fingerprint: &Fingerprint, started: Instant) -> Option<MemoizedResponse> {
        let snapshot = self.snapshot.lock();
        let entry = snapshot.get(fingerprint)?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(fingerprint = %fingerprint.short(), "Cache hit");
        Some(MemoizedResponse {
            output: entry.value.clone(),
            elapsed: started.elapsed(),
            was_cached: true,
            fingerprint: fingerprint.clone(),
            persisted: true,
        })
    }

    /// Miss path; runs with the fingerprint's flight lock held
    async fn fill(
        &self,
        request: GenerationRequest,
        fingerprint: Fingerprint,
    ) -> Result<MemoizedResponse, ApplicationError> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(fingerprint = %fingerprint.short(), "Cache miss");

        let started = Instant::now();
        let output = self.call_engine(&request).await?;
        let elapsed = started.elapsed();

        let entry = CacheEntry {
            key: fingerprint.clone(),
            value: output.clone(),
            created_at: Utc::now(),
            original_latency_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            model: request.model,
        };

        self.snapshot.lock().insert(entry);
        let persisted = match self.persist().await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    error = %e,
                    fingerprint = %fingerprint.short(),
                    "Failed to persist cache entry, keeping it in memory"
                );
                false
            },
        };

        Ok(MemoizedResponse {
            output,
            elapsed,
            was_cached: false,
            fingerprint,
            persisted,
        })
    }

    async fn call_engine(&self, request: &GenerationRequest) -> Result<GenerationOutput, ApplicationError> {
        let timeout = self.config.request_timeout;
        match tokio::time::timeout(timeout, self.engine.generate(request)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                warn!(error = %e, engine = self.engine.name(), "Remote call failed");
                Err(e.into())
            },
            Err(_) => {
                let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(timeout_ms = ms, engine = self.engine.name(), "Remote call timed out");
                Err(InferenceError::Timeout(ms).into())
            },
        }
    }

    /// Write a copy of the current entries; the copy is taken under `writer`
    async fn persist(&self) -> Result<(), ApplicationError> {
        let _writer = self.writer.lock().await;
        let snapshot = self.snapshot.lock().clone();
        self.store.save(&snapshot).await
    }

    #[cfg(test)]
    pub(crate) fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }
}
