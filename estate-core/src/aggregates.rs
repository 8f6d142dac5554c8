//! Aggregate records computed by the cached read path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entities::{Building, Contract};
use crate::error::ValidationError;
use crate::identity::{CompanyId, Timestamp};

/// Contracts ending within this many days are flagged as expiring soon.
pub const EXPIRING_SOON_DAYS: i64 = 30;

/// Occupancy as a percentage rounded to one decimal.
///
/// Returns `0.0` when there are no units.
pub fn occupancy_rate(occupied: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = occupied as f64 * 100.0 / total as f64;
    (percent * 10.0).round() / 10.0
}

/// A building joined with its unit occupancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingWithMetrics {
    #[serde(flatten)]
    pub building: Building,
    pub total_units: u64,
    pub occupied_units: u64,
    pub occupancy_rate: f64,
}

/// A contract annotated with how long it has left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractWithExpiration {
    #[serde(flatten)]
    pub contract: Contract,
    /// Negative once the end date has passed.
    pub days_until_expiration: i64,
    pub expiring_soon: bool,
}

/// Paid revenue for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub total: f64,
}

/// Composite snapshot shown on the company dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_buildings: u64,
    pub total_units: u64,
    pub occupied_units: u64,
    pub total_tenants: u64,
    pub active_contracts: u64,
    #[serde(rename = "tasaOcupacion")]
    pub occupancy_rate: f64,
    pub monthly_revenue: f64,
    pub pending_payments: u64,
    /// Oldest month first, ending with the current month.
    pub revenue_trend: Vec<MonthlyRevenue>,
}

/// Supported analytics reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsKind {
    /// Paid payments per month over the last year.
    Revenue,
    /// Expenses per category.
    Expenses,
    /// Occupancy percent per building.
    Occupancy,
    /// Open maintenance requests per priority.
    Maintenance,
}

impl AnalyticsKind {
    pub const ALL: [AnalyticsKind; 4] = [
        AnalyticsKind::Revenue,
        AnalyticsKind::Expenses,
        AnalyticsKind::Occupancy,
        AnalyticsKind::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Expenses => "expenses",
            Self::Occupancy => "occupancy",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for AnalyticsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalyticsKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "revenue" => Ok(Self::Revenue),
            "expenses" => Ok(Self::Expenses),
            "occupancy" => Ok(Self::Occupancy),
            "maintenance" => Ok(Self::Maintenance),
            _ => Err(ValidationError::InvalidValue {
                field: "type".to_string(),
                reason: format!("unknown analytics type: {}", value),
            }),
        }
    }
}

/// One labelled value of an analytics series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsPoint {
    pub label: String,
    pub value: f64,
}

/// Result of an analytics report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResult {
    pub kind: AnalyticsKind,
    pub company_id: CompanyId,
    pub generated_at: Timestamp,
    pub series: Vec<AnalyticsPoint>,
    pub total: f64,
}

impl AnalyticsResult {
    /// Build a result whose total is the sum of its series.
    pub fn from_series(
        kind: AnalyticsKind,
        company_id: CompanyId,
        generated_at: Timestamp,
        series: Vec<AnalyticsPoint>,
    ) -> Self {
        let total = series.iter().map(|p| p.value).sum();
        Self {
            kind,
            company_id,
            generated_at,
            series,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupancy_rate_zero_units() {
        assert_eq!(occupancy_rate(0, 0), 0.0);
        assert!(!occupancy_rate(0, 0).is_nan());
    }

    #[test]
    fn test_occupancy_rate_rounds_to_one_decimal() {
        assert_eq!(occupancy_rate(1, 3), 33.3);
        assert_eq!(occupancy_rate(2, 3), 66.7);
        assert_eq!(occupancy_rate(4, 4), 100.0);
    }

    #[test]
    fn test_analytics_kind_parse() {
        assert_eq!("revenue".parse::<AnalyticsKind>(), Ok(AnalyticsKind::Revenue));
        assert_eq!(" Occupancy ".parse::<AnalyticsKind>(), Ok(AnalyticsKind::Occupancy));
        assert!("churn".parse::<AnalyticsKind>().is_err());

        for kind in AnalyticsKind::ALL {
            assert_eq!(kind.as_str().parse::<AnalyticsKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_dashboard_stats_serializes_occupancy_field_name() {
        let stats = DashboardStats {
            total_buildings: 0,
            total_units: 0,
            occupied_units: 0,
            total_tenants: 0,
            active_contracts: 0,
            occupancy_rate: 0.0,
            monthly_revenue: 0.0,
            pending_payments: 0,
            revenue_trend: vec![],
        };
        let json = serde_json::to_value(&stats).expect("serialize");
        assert_eq!(json["tasaOcupacion"], serde_json::json!(0.0));
        assert!(json.get("totalBuildings").is_some());
    }

    #[test]
    fn test_analytics_result_total_is_series_sum() {
        let company = CompanyId::new("acme").expect("valid id");
        let result = AnalyticsResult::from_series(
            AnalyticsKind::Expenses,
            company,
            chrono::Utc::now(),
            vec![
                AnalyticsPoint { label: "repairs".into(), value: 120.0 },
                AnalyticsPoint { label: "cleaning".into(), value: 30.5 },
            ],
        );
        assert_eq!(result.total, 150.5);
    }
}
