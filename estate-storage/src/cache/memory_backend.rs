//! In-process cache store.
//!
//! A `HashMap` behind an `RwLock` with lazy expiry. Expiry is measured with
//! `tokio::time::Instant`, so tests can drive TTLs with paused time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use estate_core::CacheError;
use serde_json::Value;
use tokio::time::Instant;

use super::key::{CacheKey, KeyPattern};
use super::traits::{CacheStats, CacheStore};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Value,
    cached_at: DateTime<Utc>,
    expires_at: Instant,
    size_bytes: usize,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory cache store shared by every request and tenant of a process.
///
/// # Capacity
///
/// With a non-zero `max_entries`, inserting a new key into a full store
/// first drops expired entries, then the entry closest to expiry.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, MemoryEntry>>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl InMemoryCacheStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding at most `max_entries` entries (0 = unbounded).
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Self::default()
        }
    }

    /// Number of entries held, including expired ones not yet collected.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rendered keys currently held, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .map(|e| e.keys().map(|k| k.to_string()).collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> Result<u64, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        let removed = Self::purge_locked(&mut entries, Instant::now());
        self.evictions.fetch_add(removed, Ordering::Relaxed);
        Ok(removed)
    }

    fn purge_locked(entries: &mut HashMap<CacheKey, MemoryEntry>, now: Instant) -> u64 {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        (before - entries.len()) as u64
    }

    /// Make room for one new key if the store is full.
    fn ensure_capacity(&self, entries: &mut HashMap<CacheKey, MemoryEntry>, now: Instant) {
        if self.max_entries == 0 || entries.len() < self.max_entries {
            return;
        }

        let mut evicted = Self::purge_locked(entries, now);

        while entries.len() >= self.max_entries {
            let victim = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    entries.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }

        self.evictions.fetch_add(evicted, Ordering::Relaxed);
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<(Value, DateTime<Utc>)>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some((entry.value.clone(), entry.cached_at)));
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return Ok(None);
                }
            }
        }

        // Expired: collect it, unless a writer replaced it in between.
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        if let Some(entry) = entries.get(key) {
            if !entry.is_expired(now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some((entry.value.clone(), entry.cached_at)));
            }
            entries.remove(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or_else(|| CacheError::Serialization {
            reason: format!("TTL of {:?} overflows the expiry instant", ttl),
        })?;
        let size_bytes = value.to_string().len();
        let entry = MemoryEntry {
            value,
            cached_at: Utc::now(),
            expires_at,
            size_bytes,
        };

        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        if !entries.contains_key(key) {
            self.ensure_capacity(&mut entries, now);
        }
        entries.insert(key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }

    async fn invalidate_by_pattern(&self, pattern: &KeyPattern) -> Result<u64, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        let before = entries.len();
        entries.retain(|key, _| !pattern.matches(key));
        Ok((before - entries.len()) as u64)
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: entries.len() as u64,
            memory_bytes: entries.values().map(|e| e.size_bytes as u64).sum(),
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}
