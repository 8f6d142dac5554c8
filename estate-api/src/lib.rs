//! ESTATE API - Cached Query Layer
//!
//! Request handlers of the property-management service read through
//! [`CachedQueries`] and invalidate through it after committing writes.
//! This crate also selects the cache store from configuration and sets up
//! logging.

pub mod aggregation;
pub mod cached_db;
pub mod invalidation;
pub mod store;
pub mod telemetry;

// Re-export commonly used types
pub use cached_db::CachedQueries;
pub use store::{build_store, CacheStoreHandle};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig, TelemetryError};
