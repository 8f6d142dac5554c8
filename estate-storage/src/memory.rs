//! In-memory property data source.
//!
//! Holds every company's rows in process and filters by company on read.
//! Used by tests and local tooling in place of the relational store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;
use estate_core::{
    Building, CompanyId, Contract, ContractStatus, EntityId, Expense, MaintenanceRequest, Payment,
    PaymentStatus, QueryError, Tenant, Unit,
};

use crate::data_source::PropertyDataSource;

type Table<T> = Arc<RwLock<HashMap<EntityId, T>>>;

fn poisoned(table: &str) -> QueryError {
    QueryError::QueryFailed {
        reason: format!("{} table lock poisoned", table),
    }
}

/// Rows of one company, cloned out of a table.
fn company_rows<T, F>(
    table: &Table<T>,
    name: &str,
    company: &CompanyId,
    company_of: F,
) -> Result<Vec<T>, QueryError>
where
    T: Clone,
    F: Fn(&T) -> &CompanyId,
{
    let rows = table.read().map_err(|_| poisoned(name))?;
    Ok(rows
        .values()
        .filter(|row| company_of(row) == company)
        .cloned()
        .collect())
}

fn upsert<T>(table: &Table<T>, name: &str, id: EntityId, row: T) -> Result<(), QueryError> {
    table.write().map_err(|_| poisoned(name))?.insert(id, row);
    Ok(())
}

fn remove<T>(table: &Table<T>, name: &str, id: EntityId) -> Result<bool, QueryError> {
    Ok(table.write().map_err(|_| poisoned(name))?.remove(&id).is_some())
}

/// Process-local [`PropertyDataSource`].
///
/// Writes are upserts keyed by entity id. Reads return rows in a stable
/// order (by name, number or date) so results compare equal across calls.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSource {
    buildings: Table<Building>,
    units: Table<Unit>,
    tenants: Table<Tenant>,
    contracts: Table<Contract>,
    payments: Table<Payment>,
    expenses: Table<Expense>,
    maintenance: Table<MaintenanceRequest>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    // === Writes ===

    pub fn upsert_building(&self, building: Building) -> Result<(), QueryError> {
        upsert(&self.buildings, "buildings", building.id, building)
    }

    pub fn upsert_unit(&self, unit: Unit) -> Result<(), QueryError> {
        upsert(&self.units, "units", unit.id, unit)
    }

    pub fn upsert_tenant(&self, tenant: Tenant) -> Result<(), QueryError> {
        upsert(&self.tenants, "tenants", tenant.id, tenant)
    }

    pub fn upsert_contract(&self, contract: Contract) -> Result<(), QueryError> {
        upsert(&self.contracts, "contracts", contract.id, contract)
    }

    pub fn upsert_payment(&self, payment: Payment) -> Result<(), QueryError> {
        upsert(&self.payments, "payments", payment.id, payment)
    }

    pub fn upsert_expense(&self, expense: Expense) -> Result<(), QueryError> {
        upsert(&self.expenses, "expenses", expense.id, expense)
    }

    pub fn upsert_maintenance(&self, request: MaintenanceRequest) -> Result<(), QueryError> {
        upsert(&self.maintenance, "maintenance", request.id, request)
    }

    /// Delete a building. Returns whether it existed.
    pub fn delete_building(&self, id: EntityId) -> Result<bool, QueryError> {
        remove(&self.buildings, "buildings", id)
    }

    /// Delete a unit. Returns whether it existed.
    pub fn delete_unit(&self, id: EntityId) -> Result<bool, QueryError> {
        remove(&self.units, "units", id)
    }
}

#[async_trait]
impl PropertyDataSource for InMemoryDataSource {
    async fn buildings(&self, company: &CompanyId) -> Result<Vec<Building>, QueryError> {
        let mut rows = company_rows(&self.buildings, "buildings", company, |b| &b.company_id)?;
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn units(&self, company: &CompanyId) -> Result<Vec<Unit>, QueryError> {
        let mut rows = company_rows(&self.units, "units", company, |u| &u.company_id)?;
        rows.sort_by(|a, b| a.number.cmp(&b.number).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn tenants(&self, company: &CompanyId) -> Result<Vec<Tenant>, QueryError> {
        let mut rows = company_rows(&self.tenants, "tenants", company, |t| &t.company_id)?;
        rows.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn contracts(&self, company: &CompanyId) -> Result<Vec<Contract>, QueryError> {
        let mut rows = company_rows(&self.contracts, "contracts", company, |c| &c.company_id)?;
        rows.sort_by(|a, b| a.end_date.cmp(&b.end_date).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn recent_payments(
        &self,
        company: &CompanyId,
        limit: usize,
    ) -> Result<Vec<Payment>, QueryError> {
        let mut rows = company_rows(&self.payments, "payments", company, |p| &p.company_id)?;
        rows.sort_by(|a, b| b.due_date.cmp(&a.due_date).then(b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn recent_expenses(
        &self,
        company: &CompanyId,
        limit: usize,
    ) -> Result<Vec<Expense>, QueryError> {
        let mut rows = company_rows(&self.expenses, "expenses", company, |e| &e.company_id)?;
        rows.sort_by(|a, b| b.incurred_on.cmp(&a.incurred_on).then(b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn recent_maintenance(
        &self,
        company: &CompanyId,
        limit: usize,
    ) -> Result<Vec<MaintenanceRequest>, QueryError> {
        let mut rows = company_rows(&self.maintenance, "maintenance", company, |m| &m.company_id)?;
        rows.sort_by(|a, b| b.reported_at.cmp(&a.reported_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn count_buildings(&self, company: &CompanyId) -> Result<u64, QueryError> {
        Ok(company_rows(&self.buildings, "buildings", company, |b| &b.company_id)?.len() as u64)
    }

    async fn count_units(&self, company: &CompanyId) -> Result<u64, QueryError> {
        Ok(company_rows(&self.units, "units", company, |u| &u.company_id)?.len() as u64)
    }

    async fn count_occupied_units(&self, company: &CompanyId) -> Result<u64, QueryError> {
        let units = company_rows(&self.units, "units", company, |u| &u.company_id)?;
        Ok(units.iter().filter(|u| u.is_occupied()).count() as u64)
    }

    async fn count_tenants(&self, company: &CompanyId) -> Result<u64, QueryError> {
        Ok(company_rows(&self.tenants, "tenants", company, |t| &t.company_id)?.len() as u64)
    }

    async fn count_active_contracts(&self, company: &CompanyId) -> Result<u64, QueryError> {
        let contracts = company_rows(&self.contracts, "contracts", company, |c| &c.company_id)?;
        Ok(contracts
            .iter()
            .filter(|c| c.status == ContractStatus::Active)
            .count() as u64)
    }

    async fn count_payments_with_status(
        &self,
        company: &CompanyId,
        status: PaymentStatus,
    ) -> Result<u64, QueryError> {
        let payments = company_rows(&self.payments, "payments", company, |p| &p.company_id)?;
        Ok(payments.iter().filter(|p| p.status == status).count() as u64)
    }

    async fn paid_revenue_between(
        &self,
        company: &CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64, QueryError> {
        let payments = company_rows(&self.payments, "payments", company, |p| &p.company_id)?;
        Ok(payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Paid)
            .filter_map(|p| p.paid_at.map(|at| (at.date_naive(), p.amount)))
            .filter(|(day, _)| *day >= from && *day < to)
            .map(|(_, amount)| amount)
            .sum())
    }

    async fn expenses_between(
        &self,
        company: &CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Expense>, QueryError> {
        let mut rows = company_rows(&self.expenses, "expenses", company, |e| &e.company_id)?;
        rows.retain(|e| e.incurred_on >= from && e.incurred_on < to);
        rows.sort_by(|a, b| a.incurred_on.cmp(&b.incurred_on).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn open_maintenance(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<MaintenanceRequest>, QueryError> {
        let mut rows = company_rows(&self.maintenance, "maintenance", company, |m| &m.company_id)?;
        rows.retain(|m| m.status.is_open());
        rows.sort_by(|a, b| a.reported_at.cmp(&b.reported_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }
}
