//! Cached Property Queries
//!
//! `CachedQueries` wraps a [`PropertyDataSource`] with the tenant-scoped
//! read-through cache. Handlers call `cached_*` for read-heavy aggregates and
//! the matching `invalidate_*` (see `invalidation`) after committing writes.
//!
//! Each helper builds its key from the company id, caches under its domain's
//! TTL, and runs a producer that only ever queries that one company.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use estate_core::{
    occupancy_rate, AnalyticsKind, AnalyticsPoint, AnalyticsResult, BuildingWithMetrics,
    CompanyId, ContractWithExpiration, DashboardStats, EstateError, EstateResult, Expense,
    MaintenanceRequest, MonthlyRevenue, Payment, PaymentStatus, Tenant, Unit,
};
use estate_storage::{
    CacheDomain, CacheKey, CacheMetrics, CacheStore, PropertyDataSource, ReadThroughCache,
    LIST_CAP,
};

use crate::aggregation::{
    buildings_with_metrics, contracts_with_expiration, expenses_by_category,
    occupancy_by_building, open_requests_by_priority, trailing_months, REVENUE_REPORT_MONTHS,
    REVENUE_TREND_MONTHS,
};

/// Read-through cached queries over a property data source.
///
/// # Usage
///
/// ```ignore
/// let queries = CachedQueries::new(cache, Arc::new(source));
///
/// // Served from cache for up to 10 minutes
/// let buildings = queries.cached_buildings(&company_id).await?;
///
/// // After a building write commits
/// queries.invalidate_buildings_cache(&company_id).await;
/// ```
pub struct CachedQueries<S, D>
where
    S: CacheStore,
    D: PropertyDataSource,
{
    /// The read-through cache.
    pub(crate) cache: ReadThroughCache<S>,
    /// The underlying data source.
    source: Arc<D>,
}

impl<S, D> Clone for CachedQueries<S, D>
where
    S: CacheStore,
    D: PropertyDataSource,
{
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            source: Arc::clone(&self.source),
        }
    }
}

impl<S, D> CachedQueries<S, D>
where
    S: CacheStore,
    D: PropertyDataSource,
{
    pub fn new(cache: ReadThroughCache<S>, source: Arc<D>) -> Self {
        Self { cache, source }
    }

    /// Get a reference to the cache.
    pub fn cache(&self) -> &ReadThroughCache<S> {
        &self.cache
    }

    /// Get a reference to the underlying data source.
    pub fn source(&self) -> &D {
        &self.source
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    // ========================================================================
    // DASHBOARD
    // ========================================================================

    /// Company dashboard, cached as one composite for 5 minutes.
    pub async fn cached_dashboard_stats(&self, company: &CompanyId) -> EstateResult<DashboardStats> {
        let key = CacheKey::new(CacheDomain::Dashboard, company);
        let today = Utc::now().date_naive();
        self.cache
            .with_cache(&key, CacheDomain::Dashboard.ttl(), || {
                self.load_dashboard_stats(company, today)
            })
            .await
    }

    async fn load_dashboard_stats(
        &self,
        company: &CompanyId,
        today: NaiveDate,
    ) -> EstateResult<DashboardStats> {
        let source = &self.source;
        let (
            total_buildings,
            total_units,
            occupied_units,
            total_tenants,
            active_contracts,
            pending_payments,
        ) = tokio::try_join!(
            source.count_buildings(company),
            source.count_units(company),
            source.count_occupied_units(company),
            source.count_tenants(company),
            source.count_active_contracts(company),
            source.count_payments_with_status(company, PaymentStatus::Pending),
        )?;

        let mut revenue_trend = Vec::with_capacity(REVENUE_TREND_MONTHS as usize);
        for window in trailing_months(today, REVENUE_TREND_MONTHS)? {
            let total = source
                .paid_revenue_between(company, window.start, window.end)
                .await?;
            revenue_trend.push(MonthlyRevenue {
                month: window.label(),
                total,
            });
        }
        let monthly_revenue = revenue_trend.last().map(|m| m.total).unwrap_or_default();

        Ok(DashboardStats {
            total_buildings,
            total_units,
            occupied_units,
            total_tenants,
            active_contracts,
            occupancy_rate: occupancy_rate(occupied_units, total_units),
            monthly_revenue,
            pending_payments,
            revenue_trend,
        })
    }

    // ========================================================================
    // STRUCTURAL LISTS
    // ========================================================================

    /// Buildings with per-building unit occupancy.
    pub async fn cached_buildings(&self, company: &CompanyId) -> EstateResult<Vec<BuildingWithMetrics>> {
        let key = CacheKey::new(CacheDomain::Buildings, company);
        self.cache
            .with_cache(&key, CacheDomain::Buildings.ttl(), || self.load_buildings(company))
            .await
    }

    async fn load_buildings(&self, company: &CompanyId) -> EstateResult<Vec<BuildingWithMetrics>> {
        let (buildings, units) =
            tokio::try_join!(self.source.buildings(company), self.source.units(company))?;
        Ok(buildings_with_metrics(buildings, &units))
    }

    pub async fn cached_units(&self, company: &CompanyId) -> EstateResult<Vec<Unit>> {
        let key = CacheKey::new(CacheDomain::Units, company);
        self.cache
            .with_cache(&key, CacheDomain::Units.ttl(), || async {
                Ok::<_, EstateError>(self.source.units(company).await?)
            })
            .await
    }

    /// Contracts annotated with days until expiration, relative to today.
    pub async fn cached_contracts(
        &self,
        company: &CompanyId,
    ) -> EstateResult<Vec<ContractWithExpiration>> {
        let key = CacheKey::new(CacheDomain::Contracts, company);
        let today = Utc::now().date_naive();
        self.cache
            .with_cache(&key, CacheDomain::Contracts.ttl(), || async {
                let contracts = self.source.contracts(company).await?;
                Ok::<_, EstateError>(contracts_with_expiration(contracts, today))
            })
            .await
    }

    pub async fn cached_tenants(&self, company: &CompanyId) -> EstateResult<Vec<Tenant>> {
        let key = CacheKey::new(CacheDomain::Tenants, company);
        self.cache
            .with_cache(&key, CacheDomain::Tenants.ttl(), || async {
                Ok::<_, EstateError>(self.source.tenants(company).await?)
            })
            .await
    }

    // ========================================================================
    // CAPPED LISTS (most recent first, at most LIST_CAP rows)
    // ========================================================================

    pub async fn cached_payments(&self, company: &CompanyId) -> EstateResult<Vec<Payment>> {
        let key = CacheKey::new(CacheDomain::Payments, company);
        self.cache
            .with_cache(&key, CacheDomain::Payments.ttl(), || async {
                let mut rows = self.source.recent_payments(company, LIST_CAP).await?;
                rows.truncate(LIST_CAP);
                Ok::<_, EstateError>(rows)
            })
            .await
    }

    pub async fn cached_expenses(&self, company: &CompanyId) -> EstateResult<Vec<Expense>> {
        let key = CacheKey::new(CacheDomain::Expenses, company);
        self.cache
            .with_cache(&key, CacheDomain::Expenses.ttl(), || async {
                let mut rows = self.source.recent_expenses(company, LIST_CAP).await?;
                rows.truncate(LIST_CAP);
                Ok::<_, EstateError>(rows)
            })
            .await
    }

    pub async fn cached_maintenance(
        &self,
        company: &CompanyId,
    ) -> EstateResult<Vec<MaintenanceRequest>> {
        let key = CacheKey::new(CacheDomain::Maintenance, company);
        self.cache
            .with_cache(&key, CacheDomain::Maintenance.ttl(), || async {
                let mut rows = self.source.recent_maintenance(company, LIST_CAP).await?;
                rows.truncate(LIST_CAP);
                Ok::<_, EstateError>(rows)
            })
            .await
    }

    // ========================================================================
    // ANALYTICS
    // ========================================================================

    /// Analytics report by type name (`revenue`, `expenses`, `occupancy`,
    /// `maintenance`).
    ///
    /// An unknown type is a validation error and never reaches the cache.
    pub async fn cached_analytics(
        &self,
        company: &CompanyId,
        kind: &str,
    ) -> EstateResult<AnalyticsResult> {
        let kind: AnalyticsKind = kind.parse()?;
        self.cached_analytics_report(company, kind).await
    }

    /// Analytics report for an already validated type.
    pub async fn cached_analytics_report(
        &self,
        company: &CompanyId,
        kind: AnalyticsKind,
    ) -> EstateResult<AnalyticsResult> {
        let key = CacheKey::with_subtype(CacheDomain::Analytics, company, kind.as_str())?;
        let today = Utc::now().date_naive();
        self.cache
            .with_cache(&key, CacheDomain::Analytics.ttl(), || {
                self.load_analytics(company, kind, today)
            })
            .await
    }

    async fn load_analytics(
        &self,
        company: &CompanyId,
        kind: AnalyticsKind,
        today: NaiveDate,
    ) -> EstateResult<AnalyticsResult> {
        let generated_at = Utc::now();
        let months = trailing_months(today, REVENUE_REPORT_MONTHS)?;

        let result = match kind {
            AnalyticsKind::Revenue => {
                let mut series = Vec::with_capacity(months.len());
                for window in &months {
                    let value = self
                        .source
                        .paid_revenue_between(company, window.start, window.end)
                        .await?;
                    series.push(AnalyticsPoint {
                        label: window.label(),
                        value,
                    });
                }
                AnalyticsResult::from_series(kind, company.clone(), generated_at, series)
            }
            AnalyticsKind::Expenses => {
                let expenses = match (months.first(), months.last()) {
                    (Some(first), Some(last)) => {
                        self.source
                            .expenses_between(company, first.start, last.end)
                            .await?
                    }
                    _ => Vec::new(),
                };
                AnalyticsResult::from_series(
                    kind,
                    company.clone(),
                    generated_at,
                    expenses_by_category(&expenses),
                )
            }
            AnalyticsKind::Occupancy => {
                let metrics = self.load_buildings(company).await?;
                let (occupied, total) = metrics.iter().fold((0, 0), |(o, t), m| {
                    (o + m.occupied_units, t + m.total_units)
                });
                AnalyticsResult {
                    kind,
                    company_id: company.clone(),
                    generated_at,
                    series: occupancy_by_building(&metrics),
                    // Overall rate, not the sum of per-building percentages.
                    total: occupancy_rate(occupied, total),
                }
            }
            AnalyticsKind::Maintenance => {
                let open = self.source.open_maintenance(company).await?;
                AnalyticsResult::from_series(
                    kind,
                    company.clone(),
                    generated_at,
                    open_requests_by_priority(&open),
                )
            }
        };

        Ok(result)
    }
}
