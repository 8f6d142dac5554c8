//! Cache store trait and statistics.
//!
//! This module defines the contract every cache backend satisfies. Values are
//! opaque JSON; typed (de)serialization happens in the read-through service.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use estate_core::CacheError;
use serde_json::Value;

use super::key::{CacheKey, KeyPattern};

/// Cache store trait for pluggable backends.
///
/// This trait abstracts over different stores (in-memory, LMDB, or a
/// networked cache). Implementations must be thread-safe; each operation is
/// assumed atomic per key and no cross-key transactions are required.
///
/// # Expiry
///
/// `get` must never return a value past its expiry. Implementations may
/// expire lazily (on access) or eagerly.
///
/// # Errors
///
/// Backends report failures as [`CacheError`]. Callers on the read path are
/// expected to absorb them: the cache is an optimization, never a
/// dependency for correctness.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a live value and the time it was stored, or `None`.
    async fn get(&self, key: &CacheKey) -> Result<Option<(Value, DateTime<Utc>)>, CacheError>;

    /// Store `value` under `key` for `ttl`, replacing any prior entry.
    async fn set(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Remove exactly one entry. Absent keys are not an error.
    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError>;

    /// Remove every entry selected by `pattern` and return how many went.
    ///
    /// Zero matches is `Ok(0)`.
    async fn invalidate_by_pattern(&self, pattern: &KeyPattern) -> Result<u64, CacheError>;

    /// Get cache statistics.
    async fn stats(&self) -> Result<CacheStats, CacheError>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (including expired entries).
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate memory usage in bytes.
    pub memory_bytes: u64,
    /// Number of entries dropped for capacity or expiry.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
