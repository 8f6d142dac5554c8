//! Read-Through Behaviour of Cached Queries
//!
//! **Property 1: Hit without recomputation.** A second call within the TTL
//! never reaches the data source.
//!
//! **Property 2: Single computation per miss.** A miss queries the source
//! once and stores exactly one entry.
//!
//! **Property 3: TTL expiry.** Once the domain TTL has elapsed the next call
//! recomputes and overwrites the entry.
//!
//! **Property 5: Invalidation forces a miss** regardless of remaining TTL.
//!
//! **Property 6: No negative caching.** A failed query is not stored.
//!
//! **Property 11: Store failure degrades to direct computation.**
//!
//! **Property 12: A disabled cache never touches the store.**
//!
//! **Property 13: Capacity eviction** keeps the store within `max_entries`.

use std::sync::Arc;
use std::time::Duration;

use estate_storage::{CacheDomain, CacheStore, InMemoryCacheStore};
use estate_test_utils::assertions::assert_query_error;
use estate_test_utils::fixtures::{acme, building, seed_buildings, unit};
use estate_test_utils::{CacheConfig, UnavailableCacheStore, UnitStatus};

#[path = "support/harness.rs"]
mod harness;

// ============================================================================
// HITS AND MISSES
// ============================================================================

#[tokio::test]
async fn test_hit_does_not_recompute() {
    let queries = harness::queries();
    let acme = acme();
    seed_buildings(queries.source().inner(), &acme, 3);

    let first = queries.cached_buildings(&acme).await.unwrap();
    let second = queries.cached_buildings(&acme).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(queries.source().calls("buildings"), 1);
    assert_eq!(queries.source().calls("units"), 1);
    assert_eq!(queries.metrics().hits, 1);
}

#[tokio::test]
async fn test_miss_computes_once_and_stores() {
    let queries = harness::queries();
    let acme = acme();

    queries.cached_tenants(&acme).await.unwrap();

    assert_eq!(queries.source().total_calls(), 1);
    assert_eq!(queries.cache().store().keys(), vec!["tenants:list:acme".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_ttl_expiry_recomputes_and_overwrites() {
    let queries = harness::queries();
    let acme = acme();
    seed_buildings(queries.source().inner(), &acme, 1);

    assert_eq!(queries.cached_buildings(&acme).await.unwrap().len(), 1);
    seed_buildings(queries.source().inner(), &acme, 1);

    tokio::time::advance(CacheDomain::Buildings.ttl() - Duration::from_secs(1)).await;
    assert_eq!(queries.cached_buildings(&acme).await.unwrap().len(), 1, "still fresh");

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(queries.cached_buildings(&acme).await.unwrap().len(), 2, "expired");
    assert_eq!(queries.source().calls("buildings"), 2);

    assert_eq!(queries.cached_buildings(&acme).await.unwrap().len(), 2);
    assert_eq!(queries.source().calls("buildings"), 2, "overwritten entry is served");
}

#[tokio::test(start_paused = true)]
async fn test_payments_expire_before_structural_lists() {
    let queries = harness::queries();
    let acme = acme();

    queries.cached_payments(&acme).await.unwrap();
    queries.cached_units(&acme).await.unwrap();
    tokio::time::advance(CacheDomain::Payments.ttl()).await;
    queries.cached_payments(&acme).await.unwrap();
    queries.cached_units(&acme).await.unwrap();

    assert_eq!(queries.source().calls("recent_payments"), 2);
    assert_eq!(queries.source().calls("units"), 1);
}

#[tokio::test]
async fn test_invalidation_forces_miss() {
    let queries = harness::queries();
    let acme = acme();
    let tower = building(&acme, "Tower");
    queries.source().inner().upsert_building(tower.clone()).unwrap();

    queries.cached_units(&acme).await.unwrap();
    queries
        .source()
        .inner()
        .upsert_unit(unit(&acme, tower.id, "101", UnitStatus::Occupied))
        .unwrap();
    assert!(queries.cached_units(&acme).await.unwrap().is_empty(), "stale until invalidated");

    queries.invalidate_units_cache(&acme).await;
    assert_eq!(queries.cached_units(&acme).await.unwrap().len(), 1);
    assert_eq!(queries.source().calls("units"), 2);
}

// ============================================================================
// FAILURES
// ============================================================================

#[tokio::test]
async fn test_failed_query_is_not_cached() {
    let queries = harness::queries();
    let acme = acme();

    queries.source().fail("units");
    let result = queries.cached_units(&acme).await;
    assert_query_error(&result);
    assert!(queries.cache().store().is_empty());

    queries.source().heal();
    assert!(queries.cached_units(&acme).await.is_ok());
    assert_eq!(queries.source().calls("units"), 2);
    assert_eq!(queries.metrics().producer_errors, 1);
}

#[tokio::test]
async fn test_unavailable_store_falls_back_to_source() {
    let store = Arc::new(UnavailableCacheStore::new());
    let queries = harness::queries_with_store(Arc::clone(&store));
    let acme = acme();
    seed_buildings(queries.source().inner(), &acme, 2);

    for _ in 0..2 {
        assert_eq!(queries.cached_buildings(&acme).await.unwrap().len(), 2);
    }
    queries.invalidate_buildings_cache(&acme).await;
    queries.invalidate_company_cache(&acme).await;

    assert_eq!(queries.source().calls("buildings"), 2);
    assert_eq!(store.attempts(), 6);
    assert_eq!(queries.metrics().backend_errors, 6);
}

#[tokio::test]
async fn test_disabled_cache_never_touches_store() {
    let store = Arc::new(UnavailableCacheStore::new());
    let config = CacheConfig::new().with_enabled(false);
    let queries = harness::queries_with_config(Arc::clone(&store), &config);
    let acme = acme();

    queries.cached_dashboard_stats(&acme).await.unwrap();
    queries.cached_dashboard_stats(&acme).await.unwrap();
    queries.invalidate_after_write(&acme, CacheDomain::Payments).await;

    assert_eq!(store.attempts(), 0);
    assert_eq!(queries.source().calls("count_buildings"), 2);
    assert_eq!(queries.metrics().backend_errors, 0);
}

// ============================================================================
// CAPACITY
// ============================================================================

#[tokio::test]
async fn test_capacity_bounds_entry_count() {
    let queries = harness::queries_with_store(Arc::new(InMemoryCacheStore::with_capacity(3)));
    let acme = acme();

    queries.cached_units(&acme).await.unwrap();
    queries.cached_tenants(&acme).await.unwrap();
    queries.cached_payments(&acme).await.unwrap();
    queries.cached_expenses(&acme).await.unwrap();
    queries.cached_maintenance(&acme).await.unwrap();

    let stats = queries.cache().store().stats().await.unwrap();
    assert_eq!(stats.entry_count, 3);
    assert_eq!(stats.evictions, 2);
}
