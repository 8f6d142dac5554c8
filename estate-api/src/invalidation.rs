//! Cache invalidation after committed writes.
//!
//! Call these only after the write has committed. Invalidating first lets a
//! concurrent reader repopulate the key with pre-write data.
//!
//! None of these return errors: a failed invalidation is logged at `warn`
//! and the entry ages out at its TTL.

use estate_core::{AnalyticsKind, CompanyId};
use estate_storage::{CacheDomain, CacheKey, CacheStore, KeyPattern, PropertyDataSource};

use crate::cached_db::CachedQueries;

impl<S, D> CachedQueries<S, D>
where
    S: CacheStore,
    D: PropertyDataSource,
{
    pub async fn invalidate_dashboard_cache(&self, company: &CompanyId) {
        self.invalidate_domain(company, CacheDomain::Dashboard).await;
    }

    pub async fn invalidate_buildings_cache(&self, company: &CompanyId) {
        self.invalidate_domain(company, CacheDomain::Buildings).await;
    }

    pub async fn invalidate_units_cache(&self, company: &CompanyId) {
        self.invalidate_domain(company, CacheDomain::Units).await;
    }

    pub async fn invalidate_payments_cache(&self, company: &CompanyId) {
        self.invalidate_domain(company, CacheDomain::Payments).await;
    }

    pub async fn invalidate_contracts_cache(&self, company: &CompanyId) {
        self.invalidate_domain(company, CacheDomain::Contracts).await;
    }

    pub async fn invalidate_tenants_cache(&self, company: &CompanyId) {
        self.invalidate_domain(company, CacheDomain::Tenants).await;
    }

    pub async fn invalidate_expenses_cache(&self, company: &CompanyId) {
        self.invalidate_domain(company, CacheDomain::Expenses).await;
    }

    pub async fn invalidate_maintenance_cache(&self, company: &CompanyId) {
        self.invalidate_domain(company, CacheDomain::Maintenance).await;
    }

    /// Drop one analytics report, or every report of the company when `kind`
    /// is `None`.
    pub async fn invalidate_analytics_cache(&self, company: &CompanyId, kind: Option<AnalyticsKind>) {
        match kind {
            Some(kind) => match CacheKey::with_subtype(CacheDomain::Analytics, company, kind.as_str()) {
                Ok(key) => self.cache.invalidate(&key).await,
                Err(e) => {
                    tracing::warn!(company = %company, kind = %kind, error = %e, "invalid analytics key");
                }
            },
            None => {
                self.cache
                    .invalidate_pattern(&KeyPattern::CompanyDomain(company.clone(), CacheDomain::Analytics))
                    .await;
            }
        }
    }

    /// Drop every cached entry of the company, across all domains.
    pub async fn invalidate_company_cache(&self, company: &CompanyId) {
        let removed = self
            .cache
            .invalidate_pattern(&KeyPattern::Company(company.clone()))
            .await;
        tracing::debug!(company = %company, removed, "company cache cleared");
    }

    /// Invalidate `domain` and every aggregate derived from it.
    ///
    /// A committed unit write, for example, also clears the building metrics,
    /// the dashboard and the analytics reports that count units.
    pub async fn invalidate_after_write(&self, company: &CompanyId, domain: CacheDomain) {
        self.invalidate_domain(company, domain).await;
        for dependent in domain.dependents() {
            self.invalidate_domain(company, *dependent).await;
        }
    }

    async fn invalidate_domain(&self, company: &CompanyId, domain: CacheDomain) {
        match domain {
            CacheDomain::Analytics => self.invalidate_analytics_cache(company, None).await,
            _ => self.cache.invalidate(&CacheKey::new(domain, company)).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use estate_storage::{InMemoryCacheStore, InMemoryDataSource, ReadThroughCache};
    use serde_json::json;

    use super::*;

    fn company(id: &str) -> CompanyId {
        CompanyId::new(id).expect("valid company id")
    }

    async fn seeded() -> CachedQueries<InMemoryCacheStore, InMemoryDataSource> {
        let queries = CachedQueries::new(
            ReadThroughCache::new(Arc::new(InMemoryCacheStore::new())),
            Arc::new(InMemoryDataSource::new()),
        );
        let store = queries.cache().store();
        for id in ["acme", "globex"] {
            let c = company(id);
            for domain in CacheDomain::ALL {
                let key = match domain {
                    CacheDomain::Analytics => {
                        CacheKey::with_subtype(domain, &c, AnalyticsKind::Revenue.as_str()).unwrap()
                    }
                    _ => CacheKey::new(domain, &c),
                };
                store.set(&key, json!(1), Duration::from_secs(600)).await.unwrap();
            }
            let occupancy = CacheKey::with_subtype(CacheDomain::Analytics, &c, "occupancy").unwrap();
            store.set(&occupancy, json!(1), Duration::from_secs(600)).await.unwrap();
        }
        queries
    }

    fn acme_keys(queries: &CachedQueries<InMemoryCacheStore, InMemoryDataSource>) -> Vec<String> {
        queries
            .cache()
            .store()
            .keys()
            .into_iter()
            .filter(|k| k.split(':').nth(2) == Some("acme"))
            .collect()
    }

    #[tokio::test]
    async fn test_single_domain_invalidation() {
        let queries = seeded().await;
        let acme = company("acme");

        queries.invalidate_payments_cache(&acme).await;

        let keys = acme_keys(&queries);
        assert!(!keys.contains(&"payments:list:acme".to_string()));
        assert_eq!(keys.len(), 9);
        assert!(queries.cache().store().keys().contains(&"payments:list:globex".to_string()));
    }

    #[tokio::test]
    async fn test_analytics_one_type_or_all() {
        let queries = seeded().await;
        let acme = company("acme");

        queries.invalidate_analytics_cache(&acme, Some(AnalyticsKind::Revenue)).await;
        let keys = acme_keys(&queries);
        assert!(keys.contains(&"analytics:report:acme:occupancy".to_string()));
        assert!(!keys.contains(&"analytics:report:acme:revenue".to_string()));

        queries.invalidate_analytics_cache(&acme, None).await;
        assert!(acme_keys(&queries).iter().all(|k| !k.starts_with("analytics:")));
    }

    #[tokio::test]
    async fn test_company_invalidation_leaves_other_tenant() {
        let queries = seeded().await;
        queries.invalidate_company_cache(&company("acme")).await;

        assert!(acme_keys(&queries).is_empty());
        assert_eq!(queries.cache().store().len(), 10);
    }

    #[tokio::test]
    async fn test_after_write_clears_dependents() {
        let queries = seeded().await;
        let acme = company("acme");

        queries.invalidate_after_write(&acme, CacheDomain::Units).await;

        assert_eq!(
            acme_keys(&queries),
            vec![
                "contracts:list:acme".to_string(),
                "expenses:list:acme".to_string(),
                "maintenance:list:acme".to_string(),
                "payments:list:acme".to_string(),
                "tenants:list:acme".to_string(),
            ]
        );
    }
}
