//! ESTATE Core - Entity Types
//!
//! Pure data structures shared by the cache and the data layer: tenant
//! identity, domain entities, aggregate records, errors and configuration.
//! This crate performs no I/O.

pub mod aggregates;
pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;

pub use aggregates::{
    occupancy_rate, AnalyticsKind, AnalyticsPoint, AnalyticsResult, BuildingWithMetrics,
    ContractWithExpiration, DashboardStats, MonthlyRevenue, EXPIRING_SOON_DAYS,
};
pub use config::{CacheBackendKind, CacheConfig};
pub use entities::{Building, Contract, Expense, MaintenanceRequest, Payment, Tenant, Unit};
pub use enums::{
    ContractStatus, MaintenancePriority, MaintenanceStatus, PaymentStatus, UnitStatus,
};
pub use error::{
    CacheError, ConfigError, EstateError, EstateResult, QueryError, ValidationError,
};
pub use identity::{
    new_entity_id, validate_key_component, CompanyId, EntityId, Timestamp, KEY_DELIMITER,
};
