//! Shared wiring for estate-api integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use estate_api::CachedQueries;
use estate_storage::{CacheStore, InMemoryCacheStore, ReadThroughCache};
use estate_test_utils::{CacheConfig, CountingDataSource, InMemoryDataSource};

pub type Queries<S = InMemoryCacheStore> = CachedQueries<S, CountingDataSource>;

/// Cached queries over an unbounded in-memory store and a counting source.
pub fn queries() -> Queries {
    queries_with_store(Arc::new(InMemoryCacheStore::new()))
}

/// Cached queries over `store` and a counting source.
pub fn queries_with_store<S: CacheStore>(store: Arc<S>) -> Queries<S> {
    CachedQueries::new(ReadThroughCache::new(store), counting_source())
}

/// Cached queries honouring `config.enabled` over `store`.
pub fn queries_with_config<S: CacheStore>(store: Arc<S>, config: &CacheConfig) -> Queries<S> {
    CachedQueries::new(ReadThroughCache::from_config(store, config), counting_source())
}

fn counting_source() -> Arc<CountingDataSource> {
    Arc::new(CountingDataSource::new(InMemoryDataSource::new()))
}
