//! Cache store selection from configuration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use estate_core::{CacheBackendKind, CacheConfig, CacheError, ConfigError, EstateResult};
use estate_storage::{
    CacheKey, CacheStats, CacheStore, InMemoryCacheStore, KeyPattern, LmdbCacheStore,
    PropertyDataSource, ReadThroughCache,
};
use serde_json::Value;

use crate::cached_db::CachedQueries;

/// The cache store chosen at startup.
///
/// An enum rather than `Box<dyn CacheStore>` so `ReadThroughCache` stays
/// monomorphic over one concrete store type.
pub enum CacheStoreHandle {
    Memory(InMemoryCacheStore),
    Lmdb(LmdbCacheStore),
}

impl CacheStoreHandle {
    pub fn backend(&self) -> CacheBackendKind {
        match self {
            Self::Memory(_) => CacheBackendKind::Memory,
            Self::Lmdb(_) => CacheBackendKind::Lmdb,
        }
    }
}

/// Build the configured cache store.
///
/// Fails on invalid configuration or when the LMDB environment cannot be
/// opened.
pub fn build_store(config: &CacheConfig) -> EstateResult<CacheStoreHandle> {
    config.validate()?;

    match config.backend {
        CacheBackendKind::Memory => {
            tracing::info!(max_entries = config.max_entries, "using in-memory cache store");
            Ok(CacheStoreHandle::Memory(InMemoryCacheStore::with_capacity(
                config.max_entries,
            )))
        }
        CacheBackendKind::Lmdb => {
            let path = config
                .lmdb_path
                .as_ref()
                .ok_or_else(|| ConfigError::MissingRequired {
                    field: "ESTATE_CACHE_LMDB_PATH".to_string(),
                })?;
            let store = LmdbCacheStore::new(path, config.lmdb_max_size_mb).map_err(CacheError::from)?;
            Ok(CacheStoreHandle::Lmdb(store))
        }
    }
}

impl<D> CachedQueries<CacheStoreHandle, D>
where
    D: PropertyDataSource,
{
    /// Wire cached queries to the store selected by `config`.
    pub fn from_config(config: &CacheConfig, source: Arc<D>) -> EstateResult<Self> {
        let store = Arc::new(build_store(config)?);
        Ok(Self::new(ReadThroughCache::from_config(store, config), source))
    }
}

#[async_trait]
impl CacheStore for CacheStoreHandle {
    async fn get(&self, key: &CacheKey) -> Result<Option<(Value, DateTime<Utc>)>, CacheError> {
        match self {
            Self::Memory(store) => store.get(key).await,
            Self::Lmdb(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<(), CacheError> {
        match self {
            Self::Memory(store) => store.set(key, value, ttl).await,
            Self::Lmdb(store) => store.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        match self {
            Self::Memory(store) => store.delete(key).await,
            Self::Lmdb(store) => store.delete(key).await,
        }
    }

    async fn invalidate_by_pattern(&self, pattern: &KeyPattern) -> Result<u64, CacheError> {
        match self {
            Self::Memory(store) => store.invalidate_by_pattern(pattern).await,
            Self::Lmdb(store) => store.invalidate_by_pattern(pattern).await,
        }
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        match self {
            Self::Memory(store) => store.stats().await,
            Self::Lmdb(store) => store.stats().await,
        }
    }
}
