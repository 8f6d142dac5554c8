//! ESTATE Storage - Cache Stores and Data Layer Contract
//!
//! Defines the tenant-scoped cache (keys, TTL policy, stores, read-through
//! service) and the `PropertyDataSource` trait the cached queries run on.

pub mod cache;
pub mod data_source;
pub mod memory;

pub use data_source::PropertyDataSource;
pub use memory::InMemoryDataSource;

// Re-export cache types for API integration
pub use cache::{
    CacheDomain, CacheKey, CacheMetrics, CacheRead, CacheStats, CacheStore, InMemoryCacheStore,
    KeyPattern, LmdbCacheError, LmdbCacheStore, ReadThroughCache, ANALYTICS_TTL, DASHBOARD_TTL,
    LIST_CAP, OPERATIONS_TTL, PAYMENTS_TTL, STRUCTURAL_TTL,
};
