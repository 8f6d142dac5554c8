//! ESTATE Test Utilities
//!
//! Centralized test infrastructure for the ESTATE workspace:
//! - A query-counting data source spy with failure injection
//! - A cache store that is always down
//! - Proptest generators for identifiers and entities
//! - Test fixtures for common scenarios
//! - Custom assertions for ESTATE error variants

// Re-export the in-memory implementations from their source crate
pub use estate_storage::{InMemoryCacheStore, InMemoryDataSource};

// Re-export core types for convenience
pub use estate_core::{
    new_entity_id, Building, CacheConfig, CacheError, CompanyId, Contract, ContractStatus,
    EntityId, EstateError, EstateResult, Expense, MaintenancePriority, MaintenanceRequest,
    MaintenanceStatus, Payment, PaymentStatus, QueryError, Tenant, Timestamp, Unit, UnitStatus,
    ValidationError,
};

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use estate_storage::{CacheKey, CacheStats, CacheStore, KeyPattern, PropertyDataSource};
use serde_json::Value;

// ============================================================================
// DATA SOURCE SPY
// ============================================================================

/// Wraps a data source and counts calls per method.
///
/// Methods listed with [`CountingDataSource::fail`] return
/// `QueryError::QueryFailed` (still counted) until [`CountingDataSource::heal`].
#[derive(Debug, Default)]
pub struct CountingDataSource<D = InMemoryDataSource> {
    inner: D,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl<D> CountingDataSource<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// The wrapped source, e.g. to seed rows.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Calls made to `method` so far.
    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(method).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Calls made across every method.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().map(|calls| calls.values().sum()).unwrap_or(0)
    }

    pub fn reset(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    /// Make `method` fail until healed.
    pub fn fail(&self, method: &'static str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(method);
        }
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
    }

    fn record(&self, method: &'static str) -> Result<(), QueryError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(method).or_default() += 1;
        }
        let should_fail = self
            .failing
            .lock()
            .map(|failing| failing.contains(method))
            .unwrap_or(false);
        if should_fail {
            return Err(QueryError::QueryFailed {
                reason: format!("injected failure in {}", method),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<D> PropertyDataSource for CountingDataSource<D>
where
    D: PropertyDataSource,
{
    async fn buildings(&self, company: &CompanyId) -> Result<Vec<Building>, QueryError> {
        self.record("buildings")?;
        self.inner.buildings(company).await
    }

    async fn units(&self, company: &CompanyId) -> Result<Vec<Unit>, QueryError> {
        self.record("units")?;
        self.inner.units(company).await
    }

    async fn tenants(&self, company: &CompanyId) -> Result<Vec<Tenant>, QueryError> {
        self.record("tenants")?;
        self.inner.tenants(company).await
    }

    async fn contracts(&self, company: &CompanyId) -> Result<Vec<Contract>, QueryError> {
        self.record("contracts")?;
        self.inner.contracts(company).await
    }

    async fn recent_payments(&self, company: &CompanyId, limit: usize) -> Result<Vec<Payment>, QueryError> {
        self.record("recent_payments")?;
        self.inner.recent_payments(company, limit).await
    }

    async fn recent_expenses(&self, company: &CompanyId, limit: usize) -> Result<Vec<Expense>, QueryError> {
        self.record("recent_expenses")?;
        self.inner.recent_expenses(company, limit).await
    }

    async fn recent_maintenance(
        &self,
        company: &CompanyId,
        limit: usize,
    ) -> Result<Vec<MaintenanceRequest>, QueryError> {
        self.record("recent_maintenance")?;
        self.inner.recent_maintenance(company, limit).await
    }

    async fn count_buildings(&self, company: &CompanyId) -> Result<u64, QueryError> {
        self.record("count_buildings")?;
        self.inner.count_buildings(company).await
    }

    async fn count_units(&self, company: &CompanyId) -> Result<u64, QueryError> {
        self.record("count_units")?;
        self.inner.count_units(company).await
    }

    async fn count_occupied_units(&self, company: &CompanyId) -> Result<u64, QueryError> {
        self.record("count_occupied_units")?;
        self.inner.count_occupied_units(company).await
    }

    async fn count_tenants(&self, company: &CompanyId) -> Result<u64, QueryError> {
        self.record("count_tenants")?;
        self.inner.count_tenants(company).await
    }

    async fn count_active_contracts(&self, company: &CompanyId) -> Result<u64, QueryError> {
        self.record("count_active_contracts")?;
        self.inner.count_active_contracts(company).await
    }

    async fn count_payments_with_status(
        &self,
        company: &CompanyId,
        status: PaymentStatus,
    ) -> Result<u64, QueryError> {
        self.record("count_payments_with_status")?;
        self.inner.count_payments_with_status(company, status).await
    }

    async fn paid_revenue_between(
        &self,
        company: &CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64, QueryError> {
        self.record("paid_revenue_between")?;
        self.inner.paid_revenue_between(company, from, to).await
    }

    async fn expenses_between(
        &self,
        company: &CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Expense>, QueryError> {
        self.record("expenses_between")?;
        self.inner.expenses_between(company, from, to).await
    }

    async fn open_maintenance(&self, company: &CompanyId) -> Result<Vec<MaintenanceRequest>, QueryError> {
        self.record("open_maintenance")?;
        self.inner.open_maintenance(company).await
    }
}

// ============================================================================
// FAILING CACHE STORE
// ============================================================================

/// A cache store that is never reachable. Counts every attempted operation.
#[derive(Debug, Default)]
pub struct UnavailableCacheStore {
    attempts: AtomicU64,
}

impl UnavailableCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations attempted against the store.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    fn unavailable(&self) -> CacheError {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        CacheError::Unavailable {
            reason: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl CacheStore for UnavailableCacheStore {
    async fn get(&self, _key: &CacheKey) -> Result<Option<(Value, DateTime<Utc>)>, CacheError> {
        Err(self.unavailable())
    }

    async fn set(&self, _key: &CacheKey, _value: Value, _ttl: Duration) -> Result<(), CacheError> {
        Err(self.unavailable())
    }

    async fn delete(&self, _key: &CacheKey) -> Result<(), CacheError> {
        Err(self.unavailable())
    }

    async fn invalidate_by_pattern(&self, _pattern: &KeyPattern) -> Result<u64, CacheError> {
        Err(self.unavailable())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Err(self.unavailable())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for ESTATE identifiers and entities.

    use super::*;
    use estate_core::AnalyticsKind;
    use estate_storage::CacheDomain;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random entity id.
    pub fn arb_entity_id() -> impl Strategy<Value = EntityId> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a valid company id.
    pub fn arb_company_id() -> impl Strategy<Value = CompanyId> {
        "[a-z0-9][a-z0-9_-]{0,23}"
            .prop_map(|s| CompanyId::new(s).expect("pattern yields valid company ids"))
    }

    /// Generate two distinct company ids.
    pub fn arb_company_pair() -> impl Strategy<Value = (CompanyId, CompanyId)> {
        (arb_company_id(), arb_company_id()).prop_filter("distinct companies", |(a, b)| a != b)
    }

    pub fn arb_cache_domain() -> impl Strategy<Value = CacheDomain> {
        proptest::sample::select(CacheDomain::ALL.to_vec())
    }

    pub fn arb_analytics_kind() -> impl Strategy<Value = AnalyticsKind> {
        proptest::sample::select(AnalyticsKind::ALL.to_vec())
    }

    pub fn arb_unit_status() -> impl Strategy<Value = UnitStatus> {
        prop_oneof![
            Just(UnitStatus::Occupied),
            Just(UnitStatus::Available),
            Just(UnitStatus::Maintenance),
            Just(UnitStatus::Reserved),
        ]
    }

    pub fn arb_payment_status() -> impl Strategy<Value = PaymentStatus> {
        prop_oneof![
            Just(PaymentStatus::Pending),
            Just(PaymentStatus::Paid),
            Just(PaymentStatus::Overdue),
            Just(PaymentStatus::Cancelled),
        ]
    }

    /// Generate a building of `company`.
    pub fn arb_building(company: CompanyId) -> impl Strategy<Value = Building> {
        (arb_entity_id(), "[A-Z][a-z]{2,12}( Tower| Plaza| Court)?").prop_map(move |(id, name)| {
            Building {
                id,
                company_id: company.clone(),
                name,
                address: "1 Main St".to_string(),
                created_at: Utc::now(),
            }
        })
    }

    /// Generate a unit of `company` in `building_id`.
    pub fn arb_unit(company: CompanyId, building_id: EntityId) -> impl Strategy<Value = Unit> {
        (arb_entity_id(), 1u32..999, arb_unit_status(), 300.0f64..5000.0).prop_map(
            move |(id, number, status, monthly_rent)| Unit {
                id,
                company_id: company.clone(),
                building_id,
                number: number.to_string(),
                status,
                monthly_rent,
            },
        )
    }

    /// Generate a payment of `company` due in 2025 or 2026.
    pub fn arb_payment(company: CompanyId) -> impl Strategy<Value = Payment> {
        (arb_entity_id(), arb_payment_status(), 0u32..730, 50.0f64..5000.0).prop_map(
            move |(id, status, offset, amount)| {
                let due_date = fixtures::date(2025, 1, 1) + chrono::Days::new(u64::from(offset));
                let mut payment = fixtures::payment(&company, due_date, status, amount);
                payment.id = id;
                payment
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use chrono::TimeZone;

    #[track_caller]
    pub fn company(id: &str) -> CompanyId {
        CompanyId::new(id).expect("fixture company id is valid")
    }

    /// The tenant most scenarios run as.
    pub fn acme() -> CompanyId {
        company("acme")
    }

    /// A second tenant for isolation checks.
    pub fn globex() -> CompanyId {
        company("globex")
    }

    #[track_caller]
    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("fixture date is valid")
    }

    /// Noon UTC on `day`.
    #[track_caller]
    pub fn noon(day: NaiveDate) -> Timestamp {
        Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).expect("noon is valid"))
    }

    pub fn building(company: &CompanyId, name: &str) -> Building {
        Building {
            id: new_entity_id(),
            company_id: company.clone(),
            name: name.to_string(),
            address: format!("{} Avenue", name),
            created_at: Utc::now(),
        }
    }

    pub fn unit(company: &CompanyId, building_id: EntityId, number: &str, status: UnitStatus) -> Unit {
        Unit {
            id: new_entity_id(),
            company_id: company.clone(),
            building_id,
            number: number.to_string(),
            status,
            monthly_rent: 1_000.0,
        }
    }

    pub fn tenant(company: &CompanyId, full_name: &str) -> Tenant {
        Tenant {
            id: new_entity_id(),
            company_id: company.clone(),
            full_name: full_name.to_string(),
            email: format!("{}@example.com", full_name.to_lowercase().replace(' ', ".")),
            phone: None,
            created_at: Utc::now(),
        }
    }

    pub fn contract(
        company: &CompanyId,
        unit_id: EntityId,
        tenant_id: EntityId,
        end_date: NaiveDate,
        status: ContractStatus,
    ) -> Contract {
        Contract {
            id: new_entity_id(),
            company_id: company.clone(),
            unit_id,
            tenant_id,
            start_date: date(2024, 1, 1),
            end_date,
            monthly_rent: 1_000.0,
            status,
        }
    }

    /// A payment; paid ones are marked paid at noon on the due date.
    pub fn payment(company: &CompanyId, due_date: NaiveDate, status: PaymentStatus, amount: f64) -> Payment {
        Payment {
            id: new_entity_id(),
            company_id: company.clone(),
            contract_id: new_entity_id(),
            amount,
            due_date,
            paid_at: (status == PaymentStatus::Paid).then(|| noon(due_date)),
            status,
        }
    }

    pub fn expense(company: &CompanyId, category: &str, amount: f64, incurred_on: NaiveDate) -> Expense {
        Expense {
            id: new_entity_id(),
            company_id: company.clone(),
            building_id: new_entity_id(),
            category: category.to_string(),
            amount,
            incurred_on,
        }
    }

    pub fn maintenance(
        company: &CompanyId,
        priority: MaintenancePriority,
        status: MaintenanceStatus,
    ) -> MaintenanceRequest {
        MaintenanceRequest {
            id: new_entity_id(),
            company_id: company.clone(),
            unit_id: new_entity_id(),
            title: "Leaking tap".to_string(),
            priority,
            status,
            reported_at: Utc::now(),
        }
    }

    /// Insert `count` buildings named `Building 1..=count` and return them.
    #[track_caller]
    pub fn seed_buildings(source: &InMemoryDataSource, company: &CompanyId, count: usize) -> Vec<Building> {
        (1..=count)
            .map(|i| {
                let b = building(company, &format!("Building {}", i));
                source.upsert_building(b.clone()).expect("seed building");
                b
            })
            .collect()
    }

    /// Insert `count` paid payments, one per day going back from `latest`.
    #[track_caller]
    pub fn seed_payments(source: &InMemoryDataSource, company: &CompanyId, count: usize, latest: NaiveDate) {
        for i in 0..count {
            let due = latest - chrono::Days::new(i as u64);
            source
                .upsert_payment(payment(company, due, PaymentStatus::Paid, 100.0))
                .expect("seed payment");
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for ESTATE error variants.

    use super::*;

    /// Assert that an EstateResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &EstateResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that an EstateResult is a Query error.
    #[track_caller]
    pub fn assert_query_error<T: std::fmt::Debug>(result: &EstateResult<T>) {
        match result {
            Err(EstateError::Query(_)) => {}
            other => panic!("Expected Query error, got: {:?}", other),
        }
    }

    /// Assert that an EstateResult is an InvalidValue validation error on `field`.
    #[track_caller]
    pub fn assert_invalid_value<T: std::fmt::Debug>(result: &EstateResult<T>, field: &str) {
        match result {
            Err(EstateError::Validation(ValidationError::InvalidValue { field: f, .. })) => {
                assert_eq!(f, field, "Wrong field in InvalidValue error");
            }
            other => panic!("Expected InvalidValue({}), got: {:?}", field, other),
        }
    }
}
