//! Tenant-scoped read-through cache.
//!
//! Hot, read-mostly queries (dashboard stats, building metrics, entity
//! lists, analytics reports) are memoized per company for a short TTL
//! chosen by their [`CacheDomain`]. Writers invalidate the affected keys.
//!
//! # Tenant Isolation
//!
//! A [`CacheKey`] cannot be built without a [`CompanyId`](estate_core::CompanyId),
//! and [`KeyPattern`] matches key components exactly, so invalidating one
//! company never touches another company's entries.
//!
//! # Example
//!
//! ```ignore
//! let cache = ReadThroughCache::new(Arc::new(InMemoryCacheStore::new()));
//! let key = CacheKey::new(CacheDomain::Buildings, &company_id);
//!
//! let buildings = cache
//!     .with_cache(&key, CacheDomain::Buildings.ttl(), || load_buildings(&company_id))
//!     .await?;
//!
//! // After a building is created:
//! cache.invalidate(&key).await;
//! ```

pub mod domain;
pub mod freshness;
pub mod key;
pub mod lmdb_backend;
pub mod memory_backend;
pub mod read_through;
pub mod traits;

pub use domain::{
    CacheDomain, ANALYTICS_TTL, DASHBOARD_TTL, LIST_CAP, OPERATIONS_TTL, PAYMENTS_TTL,
    STRUCTURAL_TTL,
};
pub use freshness::CacheRead;
pub use key::{CacheKey, KeyPattern};
pub use lmdb_backend::{LmdbCacheError, LmdbCacheStore};
pub use memory_backend::InMemoryCacheStore;
pub use read_through::{CacheMetrics, ReadThroughCache};
pub use traits::{CacheStats, CacheStore};
