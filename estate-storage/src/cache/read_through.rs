//! Read-through cache service.
//!
//! [`ReadThroughCache::with_cache`] memoizes a producer under a key for a
//! TTL. The store is an optimization only: every backend failure is logged
//! and absorbed, and the read path falls back to running the producer.
//!
//! # Known limitations
//!
//! - **No de-duplication.** Two concurrent calls that both miss on the same
//!   key both run their producer; the last `set` wins. Producers are
//!   idempotent, so this is wasteful but not incorrect.
//! - **Lost invalidation.** If a reader's producer observes data from before
//!   a write commits, but the reader's `set` lands after the writer's
//!   invalidation, the stale value stays cached until its TTL expires. The
//!   staleness is bounded by the domain TTL; no locking is attempted.
//!
//! Cancellation is safe: nothing is written until the producer resolves, so
//! a dropped future never populates the store.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use estate_core::CacheConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::freshness::CacheRead;
use super::key::{CacheKey, KeyPattern};
use super::traits::CacheStore;

/// Counters for the read-through service.
#[derive(Debug, Default)]
struct ServiceCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    backend_errors: AtomicU64,
    producer_errors: AtomicU64,
}

/// Point-in-time copy of the service counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Calls answered from the store.
    pub hits: u64,
    /// Calls that ran the producer.
    pub misses: u64,
    /// Store failures absorbed (get, set, delete, invalidate, decode).
    pub backend_errors: u64,
    /// Producer failures propagated to callers.
    pub producer_errors: u64,
}

/// Read-through cache over a [`CacheStore`].
///
/// The store is injected, never global, so tests can hand in an in-memory
/// store (or a failing one) and assert on it directly.
///
/// # Example
///
/// ```ignore
/// let cache = ReadThroughCache::new(Arc::new(InMemoryCacheStore::new()));
/// let key = CacheKey::new(CacheDomain::Units, &company_id);
///
/// let units = cache
///     .with_cache(&key, CacheDomain::Units.ttl(), || source.units(&company_id))
///     .await?;
/// ```
pub struct ReadThroughCache<S>
where
    S: CacheStore,
{
    /// The cache store.
    store: Arc<S>,
    /// When false, every call runs the producer and the store is untouched,
    /// invalidation included.
    enabled: bool,
    counters: Arc<ServiceCounters>,
}

impl<S> ReadThroughCache<S>
where
    S: CacheStore,
{
    /// Create an enabled read-through cache.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            enabled: true,
            counters: Arc::new(ServiceCounters::default()),
        }
    }

    /// Create a read-through cache honouring `config.enabled`.
    pub fn from_config(store: Arc<S>, config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::new(store)
        }
    }

    /// Whether lookups consult the store.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get a reference to the cache store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Snapshot of the service counters.
    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            backend_errors: self.counters.backend_errors.load(Ordering::Relaxed),
            producer_errors: self.counters.producer_errors.load(Ordering::Relaxed),
        }
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// - On a hit the producer is NOT called and nothing is written.
    /// - On a miss the producer runs exactly once; its value is stored for
    ///   `ttl` and returned. A zero `ttl` skips the write.
    /// - A producer error is returned unchanged and nothing is cached.
    /// - Store failures never surface: they count as a miss (on read) or a
    ///   no-op (on write).
    pub async fn with_cache<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_compute(key, ttl, producer)
            .await
            .map(CacheRead::into_value)
    }

    /// Like [`ReadThroughCache::with_cache`], but reports hit/miss metadata.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        producer: F,
    ) -> Result<CacheRead<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.enabled {
            return producer().await.map(CacheRead::from_producer);
        }

        if let Some((value, cached_at)) = self.lookup::<T>(key).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "cache hit");
            return Ok(CacheRead::from_cache(value, cached_at));
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, "cache miss");

        let value = match producer().await {
            Ok(value) => value,
            Err(e) => {
                self.counters.producer_errors.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        self.store_value(key, &value, ttl).await;
        Ok(CacheRead::from_producer(value))
    }

    /// Typed store lookup. Any failure reads as a miss.
    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<(T, DateTime<Utc>)> {
        let (raw, cached_at) = match self.store.get(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                self.counters.backend_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %e, "cache get failed, computing directly");
                return None;
            }
        };

        match serde_json::from_value(raw) {
            Ok(value) => Some((value, cached_at)),
            Err(e) => {
                // Shape changed since the entry was written; the miss path overwrites it.
                self.counters.backend_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %e, "cached value undecodable, treating as miss");
                None
            }
        }
    }

    /// Best-effort write of a freshly computed value.
    async fn store_value<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if ttl.is_zero() {
            tracing::warn!(key = %key, "zero TTL, result not cached");
            return;
        }

        let raw = match serde_json::to_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                self.counters.backend_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %e, "result not serializable, not cached");
                return;
            }
        };

        if let Err(e) = self.store.set(key, raw, ttl).await {
            self.counters.backend_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(key = %key, error = %e, "cache set failed");
        }
    }

    /// Delete one key. Failures are logged, never returned.
    pub async fn invalidate(&self, key: &CacheKey) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.store.delete(key).await {
            self.counters.backend_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(key = %key, error = %e, "cache invalidation failed, entry may stay stale until TTL");
        } else {
            tracing::debug!(key = %key, "cache entry invalidated");
        }
    }

    /// Delete every key selected by `pattern` and return how many went.
    ///
    /// Failures are logged and reported as zero.
    pub async fn invalidate_pattern(&self, pattern: &KeyPattern) -> u64 {
        if !self.enabled {
            return 0;
        }
        match self.store.invalidate_by_pattern(pattern).await {
            Ok(removed) => {
                tracing::debug!(pattern = %pattern, removed, "cache pattern invalidated");
                removed
            }
            Err(e) => {
                self.counters.backend_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(pattern = %pattern, error = %e, "cache pattern invalidation failed, entries may stay stale until TTL");
                0
            }
        }
    }
}

impl<S> Clone for ReadThroughCache<S>
where
    S: CacheStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            enabled: self.enabled,
            counters: Arc::clone(&self.counters),
        }
    }
}
