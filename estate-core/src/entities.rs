//! Entity records returned by the data layer.
//!
//! Every record carries the `company_id` it belongs to so that tenant
//! scoping can be asserted on results, not just on queries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::enums::{
    ContractStatus, MaintenancePriority, MaintenanceStatus, PaymentStatus, UnitStatus,
};
use crate::identity::{CompanyId, EntityId, Timestamp};

/// A building managed by a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub id: EntityId,
    pub company_id: CompanyId,
    pub name: String,
    pub address: String,
    pub created_at: Timestamp,
}

/// A rentable unit inside a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: EntityId,
    pub company_id: CompanyId,
    pub building_id: EntityId,
    pub number: String,
    pub status: UnitStatus,
    pub monthly_rent: f64,
}

impl Unit {
    pub fn is_occupied(&self) -> bool {
        self.status == UnitStatus::Occupied
    }
}

/// A person renting one or more units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: EntityId,
    pub company_id: CompanyId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: Timestamp,
}

/// A rental agreement between a tenant and a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: EntityId,
    pub company_id: CompanyId,
    pub unit_id: EntityId,
    pub tenant_id: EntityId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: f64,
    pub status: ContractStatus,
}

/// A payment owed or made under a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: EntityId,
    pub company_id: CompanyId,
    pub contract_id: EntityId,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub paid_at: Option<Timestamp>,
    pub status: PaymentStatus,
}

/// An operating expense attributed to a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: EntityId,
    pub company_id: CompanyId,
    pub building_id: EntityId,
    pub category: String,
    pub amount: f64,
    pub incurred_on: NaiveDate,
}

/// A maintenance ticket for a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRequest {
    pub id: EntityId,
    pub company_id: CompanyId,
    pub unit_id: EntityId,
    pub title: String,
    pub priority: MaintenancePriority,
    pub status: MaintenanceStatus,
    pub reported_at: Timestamp,
}
