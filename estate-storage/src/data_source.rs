//! Data-layer contract consumed by the cached query helpers.
//!
//! Each method is one tenant-scoped primitive query. Implementations must
//! only ever return rows belonging to the given company.

use async_trait::async_trait;
use chrono::NaiveDate;
use estate_core::{
    Building, CompanyId, Contract, Expense, MaintenanceRequest, Payment, PaymentStatus, QueryError,
    Tenant, Unit,
};

/// Async, tenant-scoped access to property data.
///
/// Date ranges are half-open: `from` inclusive, `to` exclusive.
#[async_trait]
pub trait PropertyDataSource: Send + Sync {
    // ========================================================================
    // LISTS
    // ========================================================================

    /// All buildings of a company.
    async fn buildings(&self, company: &CompanyId) -> Result<Vec<Building>, QueryError>;

    /// All units of a company, across buildings.
    async fn units(&self, company: &CompanyId) -> Result<Vec<Unit>, QueryError>;

    /// All tenants of a company.
    async fn tenants(&self, company: &CompanyId) -> Result<Vec<Tenant>, QueryError>;

    /// All contracts of a company.
    async fn contracts(&self, company: &CompanyId) -> Result<Vec<Contract>, QueryError>;

    /// Most recent payments first (by due date), at most `limit`.
    async fn recent_payments(
        &self,
        company: &CompanyId,
        limit: usize,
    ) -> Result<Vec<Payment>, QueryError>;

    /// Most recent expenses first, at most `limit`.
    async fn recent_expenses(
        &self,
        company: &CompanyId,
        limit: usize,
    ) -> Result<Vec<Expense>, QueryError>;

    /// Most recently reported maintenance requests first, at most `limit`.
    async fn recent_maintenance(
        &self,
        company: &CompanyId,
        limit: usize,
    ) -> Result<Vec<MaintenanceRequest>, QueryError>;

    // ========================================================================
    // COUNTS
    // ========================================================================

    async fn count_buildings(&self, company: &CompanyId) -> Result<u64, QueryError>;

    async fn count_units(&self, company: &CompanyId) -> Result<u64, QueryError>;

    async fn count_occupied_units(&self, company: &CompanyId) -> Result<u64, QueryError>;

    async fn count_tenants(&self, company: &CompanyId) -> Result<u64, QueryError>;

    async fn count_active_contracts(&self, company: &CompanyId) -> Result<u64, QueryError>;

    async fn count_payments_with_status(
        &self,
        company: &CompanyId,
        status: PaymentStatus,
    ) -> Result<u64, QueryError>;

    // ========================================================================
    // AGGREGATES
    // ========================================================================

    /// Sum of paid payments whose payment date falls in `[from, to)`.
    async fn paid_revenue_between(
        &self,
        company: &CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64, QueryError>;

    /// Expenses incurred in `[from, to)`.
    async fn expenses_between(
        &self,
        company: &CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Expense>, QueryError>;

    /// Maintenance requests not yet completed or cancelled.
    async fn open_maintenance(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<MaintenanceRequest>, QueryError>;
}
