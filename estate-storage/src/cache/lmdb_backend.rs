//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a memory-mapped
//! key-value store that survives restarts and is shared by every process on
//! the host that opens the same directory.
//!
//! # Layout
//!
//! - Key: the rendered [`CacheKey`] bytes (`payments:list:acme`)
//! - Value: `[expires_at: i64 LE millis][cached_at: i64 LE millis][json]`
//!
//! Expiry uses wall-clock time because entries outlive the process. Expired
//! entries are removed lazily on `get`.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get` and `stats`
//! - Write transactions for `set`, `delete`, expiry and pattern invalidation
//! - Hit/miss counters are atomics

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use estate_core::CacheError;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use serde_json::Value;

use super::key::{CacheKey, KeyPattern};
use super::traits::{CacheStats, CacheStore};

/// Size of the `[expires_at][cached_at]` value header.
const HEADER_LEN: usize = 16;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for CacheError {
    fn from(e: LmdbCacheError) -> Self {
        match e {
            LmdbCacheError::Serialization(reason) => CacheError::Serialization { reason },
            LmdbCacheError::Deserialization(reason) => CacheError::Deserialization { reason },
            LmdbCacheError::Transaction(reason) => CacheError::Transaction { reason },
            other => CacheError::Unavailable {
                reason: other.to_string(),
            },
        }
    }
}

fn txn_error(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// Encode a value with its expiry header.
fn encode_value(
    value: &Value,
    cached_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<Vec<u8>, LmdbCacheError> {
    let json = serde_json::to_vec(value).map_err(|e| LmdbCacheError::Serialization(e.to_string()))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + json.len());
    bytes.extend_from_slice(&expires_at.timestamp_millis().to_le_bytes());
    bytes.extend_from_slice(&cached_at.timestamp_millis().to_le_bytes());
    bytes.extend_from_slice(&json);
    Ok(bytes)
}

/// Split a stored value into `(expires_at_millis, cached_at_millis, json)`.
fn decode_header(bytes: &[u8]) -> Result<(i64, i64, &[u8]), LmdbCacheError> {
    if bytes.len() < HEADER_LEN {
        return Err(LmdbCacheError::Deserialization("Value shorter than header".into()));
    }
    let expires: [u8; 8] = bytes[0..8]
        .try_into()
        .map_err(|_| LmdbCacheError::Deserialization("Invalid expiry".into()))?;
    let cached: [u8; 8] = bytes[8..16]
        .try_into()
        .map_err(|_| LmdbCacheError::Deserialization("Invalid timestamp".into()))?;
    Ok((
        i64::from_le_bytes(expires),
        i64::from_le_bytes(cached),
        &bytes[HEADER_LEN..],
    ))
}

/// LMDB-backed cache store.
///
/// # Example
///
/// ```ignore
/// use estate_storage::cache::{CacheDomain, CacheKey, CacheStore, LmdbCacheStore};
///
/// let store = LmdbCacheStore::new("/var/cache/estate", 64)?;
/// let key = CacheKey::new(CacheDomain::Units, &company_id);
/// store.set(&key, value, CacheDomain::Units.ttl()).await?;
/// let cached = store.get(&key).await?;
/// ```
pub struct LmdbCacheStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LmdbCacheStore {
    /// Create a new LMDB cache store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        let map_size = max_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| LmdbCacheError::EnvOpen(format!("map size of {} MB overflows", max_size_mb)))?;
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_error)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_error)?;

        tracing::info!(path = %path.as_ref().display(), max_size_mb, "LMDB cache store opened");

        Ok(Self {
            env,
            db,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    /// Read the raw bytes stored under `key`.
    fn read_raw(&self, encoded_key: &[u8]) -> Result<Option<Vec<u8>>, LmdbCacheError> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        let bytes = self
            .db
            .get(&rtxn, encoded_key)
            .map_err(txn_error)?
            .map(|b| b.to_vec());
        Ok(bytes)
    }

    /// Delete `key` if it is still expired at `now_millis`.
    fn remove_if_expired(&self, encoded_key: &[u8], now_millis: i64) -> Result<(), LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let still_expired = match self.db.get(&wtxn, encoded_key).map_err(txn_error)? {
            Some(bytes) => decode_header(bytes).map(|(exp, _, _)| exp <= now_millis).unwrap_or(true),
            None => false,
        };
        if still_expired && self.db.delete(&mut wtxn, encoded_key).map_err(txn_error)? {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        wtxn.commit().map_err(txn_error)
    }

    fn delete_raw(&self, encoded_key: &[u8]) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let deleted = self.db.delete(&mut wtxn, encoded_key).map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(deleted)
    }

    /// Delete every key matching `pattern` in one write transaction.
    fn delete_matching(&self, pattern: &KeyPattern) -> Result<u64, LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;

        let mut doomed = Vec::new();
        for result in self.db.iter(&wtxn).map_err(txn_error)? {
            let (raw_key, _) = result.map_err(txn_error)?;
            // Keys that no longer parse can never be read back; collect them too.
            let selected = match CacheKey::decode(raw_key) {
                Some(key) => pattern.matches(&key),
                None => true,
            };
            if selected {
                doomed.push(raw_key.to_vec());
            }
        }

        let mut deleted = 0u64;
        for raw_key in &doomed {
            if self.db.delete(&mut wtxn, raw_key).map_err(txn_error)? {
                deleted += 1;
            }
        }

        wtxn.commit().map_err(txn_error)?;
        Ok(deleted)
    }
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<(Value, DateTime<Utc>)>, CacheError> {
        let encoded_key = key.encode();

        let Some(bytes) = self.read_raw(&encoded_key)? else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let now_millis = Utc::now().timestamp_millis();
        let (expires_at, cached_at, json) = decode_header(&bytes)?;
        if expires_at <= now_millis {
            self.misses.fetch_add(1, Ordering::Relaxed);
            self.remove_if_expired(&encoded_key, now_millis)?;
            return Ok(None);
        }

        let value: Value = serde_json::from_slice(json)
            .map_err(|e| LmdbCacheError::Deserialization(e.to_string()))?;
        let cached_at = DateTime::from_timestamp_millis(cached_at).unwrap_or_else(Utc::now);

        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some((value, cached_at)))
    }

    async fn set(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let cached_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| CacheError::Serialization {
            reason: format!("TTL out of range: {}", e),
        })?;
        let expires_at = cached_at
            .checked_add_signed(ttl)
            .ok_or_else(|| CacheError::Serialization {
                reason: "TTL overflows the expiry timestamp".to_string(),
            })?;
        let bytes = encode_value(&value, cached_at, expires_at)?;

        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        self.db
            .put(&mut wtxn, &key.encode(), &bytes)
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.delete_raw(&key.encode())?;
        Ok(())
    }

    async fn invalidate_by_pattern(&self, pattern: &KeyPattern) -> Result<u64, CacheError> {
        Ok(self.delete_matching(pattern)?)
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        let entry_count = self.db.len(&rtxn).map_err(txn_error)?;

        let mut memory_bytes = 0u64;
        for result in self.db.iter(&rtxn).map_err(txn_error)? {
            let (k, v) = result.map_err(txn_error)?;
            memory_bytes += (k.len() + v.len()) as u64;
        }

        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
            memory_bytes,
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::domain::CacheDomain;
    use estate_core::CompanyId;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbCacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbCacheStore::new(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    fn key(domain: CacheDomain, id: &str) -> CacheKey {
        CacheKey::new(domain, &CompanyId::new(id).expect("valid company id"))
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let (store, _dir) = create_test_store();
        let k = key(CacheDomain::Tenants, "acme");
        let value = json!([{"fullName": "Ana"}, {"fullName": "Luis"}]);

        store.set(&k, value.clone(), Duration::from_secs(60)).await.unwrap();
        let (cached, cached_at) = store.get(&k).await.unwrap().expect("entry present");

        assert_eq!(cached, value);
        assert!(cached_at <= Utc::now());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (store, _dir) = create_test_store();
        assert!(store.get(&key(CacheDomain::Units, "acme")).await.unwrap().is_none());
        assert_eq!(store.stats().await.unwrap().misses, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent_and_collected() {
        let (store, _dir) = create_test_store();
        let k = key(CacheDomain::Payments, "acme");

        store.set(&k, json!(1), Duration::from_millis(1)).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));

        assert!(store.get(&k).await.unwrap().is_none());
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _dir) = create_test_store();
        let k = key(CacheDomain::Units, "acme");

        store.set(&k, json!(1), Duration::from_secs(60)).await.unwrap();
        store.delete(&k).await.unwrap();
        assert!(store.get(&k).await.unwrap().is_none());

        // Deleting again is not an error.
        assert!(store.delete(&k).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalidate_company() {
        let (store, _dir) = create_test_store();
        let ttl = Duration::from_secs(60);
        store.set(&key(CacheDomain::Units, "acme"), json!(1), ttl).await.unwrap();
        store.set(&key(CacheDomain::Payments, "acme"), json!(2), ttl).await.unwrap();
        store.set(&key(CacheDomain::Units, "acme2"), json!(3), ttl).await.unwrap();

        let company = CompanyId::new("acme").unwrap();
        let deleted = store
            .invalidate_by_pattern(&KeyPattern::Company(company))
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert!(store.get(&key(CacheDomain::Units, "acme2")).await.unwrap().is_some());
        assert_eq!(store.stats().await.unwrap().entry_count, 1);
    }

    #[tokio::test]
    async fn test_invalidate_analytics_for_company() {
        let (store, _dir) = create_test_store();
        let ttl = Duration::from_secs(60);
        let company = CompanyId::new("acme").unwrap();
        for kind in ["revenue", "expenses"] {
            let k = CacheKey::with_subtype(CacheDomain::Analytics, &company, kind).unwrap();
            store.set(&k, json!(kind), ttl).await.unwrap();
        }
        store.set(&key(CacheDomain::Units, "acme"), json!(1), ttl).await.unwrap();

        let deleted = store
            .invalidate_by_pattern(&KeyPattern::CompanyDomain(company, CacheDomain::Analytics))
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert!(store.get(&key(CacheDomain::Units, "acme")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reopen_keeps_entries() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let k = key(CacheDomain::Contracts, "acme");
        {
            let store = LmdbCacheStore::new(temp_dir.path(), 10).unwrap();
            store.set(&k, json!("persisted"), Duration::from_secs(60)).await.unwrap();
        }
        let store = LmdbCacheStore::new(temp_dir.path(), 10).unwrap();
        let (value, _) = store.get(&k).await.unwrap().expect("entry survives reopen");
        assert_eq!(value, json!("persisted"));
    }

    #[test]
    fn test_oversized_map_is_rejected() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let result = LmdbCacheStore::new(temp_dir.path(), usize::MAX);
        assert!(matches!(result, Err(LmdbCacheError::EnvOpen(_))));
    }

    #[tokio::test]
    async fn test_set_rejects_unrepresentable_ttl() {
        let (store, _dir) = create_test_store();
        let k = key(CacheDomain::Units, "acme");

        for ttl in [Duration::from_secs(100_000_000_000_000), Duration::MAX] {
            let result = store.set(&k, json!(1), ttl).await;
            assert!(matches!(result, Err(CacheError::Serialization { .. })));
        }
        assert!(store.get(&k).await.unwrap().is_none());
    }

    #[test]
    fn test_decode_header_rejects_short_values() {
        assert!(decode_header(&[0u8; 15]).is_err());
        let bytes = encode_value(&json!(null), Utc::now(), Utc::now()).unwrap();
        let (_, _, json) = decode_header(&bytes).unwrap();
        assert_eq!(json, b"null");
    }

    #[test]
    fn test_error_conversion() {
        let err: CacheError = LmdbCacheError::Transaction("boom".into()).into();
        assert!(matches!(err, CacheError::Transaction { .. }));
        let err: CacheError = LmdbCacheError::EnvOpen("boom".into()).into();
        assert!(matches!(err, CacheError::Unavailable { .. }));
    }
}
