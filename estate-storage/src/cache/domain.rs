//! Cached domains and their TTL classes.
//!
//! Every domain has exactly one TTL, fixed at compile time, chosen by how
//! often the underlying data changes. There is no per-key override: the same
//! company's same domain is always cached for the same duration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const MINUTE: u64 = 60;

/// Aggregated dashboard, moderately volatile.
pub const DASHBOARD_TTL: Duration = Duration::from_secs(5 * MINUTE);
/// Buildings, units, contracts and tenants change rarely.
pub const STRUCTURAL_TTL: Duration = Duration::from_secs(10 * MINUTE);
/// Financial state changes often.
pub const PAYMENTS_TTL: Duration = Duration::from_secs(3 * MINUTE);
/// Expenses and maintenance change at a moderate rate.
pub const OPERATIONS_TTL: Duration = Duration::from_secs(5 * MINUTE);
/// Expensive to compute, tolerant of staleness.
pub const ANALYTICS_TTL: Duration = Duration::from_secs(15 * MINUTE);

/// Maximum number of rows cached by list helpers for high-volume domains.
pub const LIST_CAP: usize = 100;

/// A family of cached results sharing key shape, TTL and invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheDomain {
    Dashboard,
    Buildings,
    Units,
    Contracts,
    Tenants,
    Payments,
    Expenses,
    Maintenance,
    Analytics,
}

impl CacheDomain {
    pub const ALL: [CacheDomain; 9] = [
        CacheDomain::Dashboard,
        CacheDomain::Buildings,
        CacheDomain::Units,
        CacheDomain::Contracts,
        CacheDomain::Tenants,
        CacheDomain::Payments,
        CacheDomain::Expenses,
        CacheDomain::Maintenance,
        CacheDomain::Analytics,
    ];

    /// First component of a rendered key.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Buildings => "buildings",
            Self::Units => "units",
            Self::Contracts => "contracts",
            Self::Tenants => "tenants",
            Self::Payments => "payments",
            Self::Expenses => "expenses",
            Self::Maintenance => "maintenance",
            Self::Analytics => "analytics",
        }
    }

    /// Second component of a rendered key.
    pub const fn subresource(&self) -> &'static str {
        match self {
            Self::Dashboard => "stats",
            Self::Buildings => "metrics",
            Self::Analytics => "report",
            Self::Units
            | Self::Contracts
            | Self::Tenants
            | Self::Payments
            | Self::Expenses
            | Self::Maintenance => "list",
        }
    }

    /// TTL class of this domain.
    pub const fn ttl(&self) -> Duration {
        match self {
            Self::Dashboard => DASHBOARD_TTL,
            Self::Buildings | Self::Units | Self::Contracts | Self::Tenants => STRUCTURAL_TTL,
            Self::Payments => PAYMENTS_TTL,
            Self::Expenses | Self::Maintenance => OPERATIONS_TTL,
            Self::Analytics => ANALYTICS_TTL,
        }
    }

    /// Whether list results of this domain are capped at [`LIST_CAP`].
    pub const fn is_capped(&self) -> bool {
        matches!(self, Self::Payments | Self::Expenses | Self::Maintenance)
    }

    /// Aggregates computed from this domain's rows.
    ///
    /// A write to `self` leaves these stale as well.
    pub const fn dependents(&self) -> &'static [CacheDomain] {
        match self {
            Self::Buildings => &[Self::Dashboard, Self::Analytics],
            Self::Units => &[Self::Buildings, Self::Dashboard, Self::Analytics],
            Self::Payments => &[Self::Dashboard, Self::Analytics],
            Self::Contracts | Self::Tenants => &[Self::Dashboard],
            Self::Expenses | Self::Maintenance => &[Self::Analytics],
            Self::Dashboard | Self::Analytics => &[],
        }
    }

    /// Inverse of [`CacheDomain::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name() == name)
    }
}

impl fmt::Display for CacheDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_classes() {
        assert_eq!(CacheDomain::Dashboard.ttl(), Duration::from_secs(300));
        assert_eq!(CacheDomain::Buildings.ttl(), Duration::from_secs(600));
        assert_eq!(CacheDomain::Units.ttl(), Duration::from_secs(600));
        assert_eq!(CacheDomain::Contracts.ttl(), Duration::from_secs(600));
        assert_eq!(CacheDomain::Tenants.ttl(), Duration::from_secs(600));
        assert_eq!(CacheDomain::Payments.ttl(), Duration::from_secs(180));
        assert_eq!(CacheDomain::Expenses.ttl(), Duration::from_secs(300));
        assert_eq!(CacheDomain::Maintenance.ttl(), Duration::from_secs(300));
        assert_eq!(CacheDomain::Analytics.ttl(), Duration::from_secs(900));
    }

    #[test]
    fn test_every_ttl_is_positive() {
        for domain in CacheDomain::ALL {
            assert!(domain.ttl() > Duration::ZERO, "{} has zero TTL", domain);
        }
    }

    #[test]
    fn test_name_roundtrip() {
        for domain in CacheDomain::ALL {
            assert_eq!(CacheDomain::from_name(domain.name()), Some(domain));
        }
        assert_eq!(CacheDomain::from_name("invoices"), None);
    }

    #[test]
    fn test_capped_domains() {
        let capped: Vec<_> = CacheDomain::ALL.into_iter().filter(|d| d.is_capped()).collect();
        assert_eq!(
            capped,
            vec![CacheDomain::Payments, CacheDomain::Expenses, CacheDomain::Maintenance]
        );
    }

    #[test]
    fn test_unit_writes_refresh_building_metrics() {
        assert!(CacheDomain::Units.dependents().contains(&CacheDomain::Buildings));
        assert!(!CacheDomain::Buildings.dependents().contains(&CacheDomain::Units));
    }

    #[test]
    fn test_dependents_never_include_self() {
        for domain in CacheDomain::ALL {
            assert!(!domain.dependents().contains(&domain));
        }
    }
}
