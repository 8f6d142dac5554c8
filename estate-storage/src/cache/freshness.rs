//! Cache read results carrying freshness metadata.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of a read-through lookup.
///
/// Carries whether the value came from the cache or was freshly computed,
/// and when it was stored, so handlers can surface it (e.g. an `X-Cache`
/// header or an "updated N seconds ago" hint).
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    /// The value.
    value: T,
    /// When this value was cached (or computed, on a miss).
    cached_at: DateTime<Utc>,
    /// Whether this was a cache hit or miss.
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// Create a new cache read from a cache hit.
    pub fn from_cache(value: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at,
            was_cache_hit: true,
        }
    }

    /// Create a new cache read from a fresh computation (cache miss).
    pub fn from_producer(value: T) -> Self {
        Self {
            value,
            cached_at: Utc::now(),
            was_cache_hit: false,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get a reference to the underlying value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Calculate how stale the data is.
    pub fn staleness(&self) -> Duration {
        (Utc::now() - self.cached_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Get when this value was cached.
    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    /// Check if this was a cache hit.
    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    /// Check if this was a cache miss (freshly computed).
    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_read_from_cache() {
        let cached_at = Utc::now();
        let read = CacheRead::from_cache("value".to_string(), cached_at);

        assert!(read.was_cache_hit());
        assert!(!read.was_cache_miss());
        assert_eq!(read.value(), "value");
        assert_eq!(read.cached_at(), cached_at);
    }

    #[test]
    fn test_cache_read_from_producer() {
        let read = CacheRead::from_producer(42i32);
        assert!(read.was_cache_miss());
        assert_eq!(read.into_value(), 42);
    }

    #[test]
    fn test_cache_read_staleness() {
        let past = Utc::now() - chrono::Duration::seconds(5);
        let read = CacheRead::from_cache("test", past);

        let staleness = read.staleness();
        assert!(staleness >= Duration::from_secs(4));
        assert!(staleness <= Duration::from_secs(10));
    }

    #[test]
    fn test_cache_read_map() {
        let read = CacheRead::from_producer(42i32);
        let mapped = read.map(|v| v.to_string());
        assert_eq!(mapped.into_value(), "42");
    }
}
