//! Pure aggregation over rows returned by the data source.
//!
//! Everything here is deterministic given its inputs (including "today"), so
//! the cached producers stay easy to test without a clock.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, Months, NaiveDate};
use estate_core::{
    occupancy_rate, AnalyticsPoint, Building, BuildingWithMetrics, Contract,
    ContractWithExpiration, EntityId, Expense, MaintenanceRequest, Unit, ValidationError,
    EXPIRING_SOON_DAYS,
};

/// Months covered by the dashboard revenue trend.
pub const REVENUE_TREND_MONTHS: u32 = 6;

/// Months covered by the revenue analytics report.
pub const REVENUE_REPORT_MONTHS: u32 = 12;

/// A calendar month as a half-open date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    /// The month containing `day`.
    pub fn containing(day: NaiveDate) -> Result<Self, ValidationError> {
        let start = day - Days::new(u64::from(day.day0()));
        let end = start
            .checked_add_months(Months::new(1))
            .ok_or_else(|| out_of_range(day))?;
        Ok(Self { start, end })
    }

    /// `YYYY-MM`
    pub fn label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }
}

fn out_of_range(day: NaiveDate) -> ValidationError {
    ValidationError::InvalidValue {
        field: "date".to_string(),
        reason: format!("{} is outside the supported calendar range", day),
    }
}

/// The `count` calendar months ending with the month of `today`, oldest first.
pub fn trailing_months(today: NaiveDate, count: u32) -> Result<Vec<MonthWindow>, ValidationError> {
    let current = MonthWindow::containing(today)?;
    (0..count)
        .rev()
        .map(|back| {
            let start = current
                .start
                .checked_sub_months(Months::new(back))
                .ok_or_else(|| out_of_range(today))?;
            MonthWindow::containing(start)
        })
        .collect()
}

/// Join buildings with their units' occupancy. Buildings keep their order.
pub fn buildings_with_metrics(buildings: Vec<Building>, units: &[Unit]) -> Vec<BuildingWithMetrics> {
    let mut counts: HashMap<EntityId, (u64, u64)> = HashMap::new();
    for unit in units {
        let entry = counts.entry(unit.building_id).or_default();
        entry.0 += 1;
        if unit.is_occupied() {
            entry.1 += 1;
        }
    }

    buildings
        .into_iter()
        .map(|building| {
            let (total_units, occupied_units) = counts.get(&building.id).copied().unwrap_or_default();
            BuildingWithMetrics {
                building,
                total_units,
                occupied_units,
                occupancy_rate: occupancy_rate(occupied_units, total_units),
            }
        })
        .collect()
}

/// Annotate contracts with the days left until their end date.
pub fn contracts_with_expiration(contracts: Vec<Contract>, today: NaiveDate) -> Vec<ContractWithExpiration> {
    contracts
        .into_iter()
        .map(|contract| {
            let days_until_expiration = (contract.end_date - today).num_days();
            ContractWithExpiration {
                expiring_soon: (0..=EXPIRING_SOON_DAYS).contains(&days_until_expiration),
                days_until_expiration,
                contract,
            }
        })
        .collect()
}

/// Expense totals per category, alphabetically.
pub fn expenses_by_category(expenses: &[Expense]) -> Vec<AnalyticsPoint> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category.as_str()).or_default() += expense.amount;
    }
    totals
        .into_iter()
        .map(|(label, value)| AnalyticsPoint {
            label: label.to_string(),
            value,
        })
        .collect()
}

/// Occupancy percent per building, labelled by building name.
pub fn occupancy_by_building(metrics: &[BuildingWithMetrics]) -> Vec<AnalyticsPoint> {
    metrics
        .iter()
        .map(|m| AnalyticsPoint {
            label: m.building.name.clone(),
            value: m.occupancy_rate,
        })
        .collect()
}

/// Count of open requests per priority, most urgent first.
pub fn open_requests_by_priority(requests: &[MaintenanceRequest]) -> Vec<AnalyticsPoint> {
    let mut counts = BTreeMap::new();
    for request in requests.iter().filter(|r| r.status.is_open()) {
        *counts.entry(request.priority).or_insert(0u64) += 1;
    }
    counts
        .into_iter()
        .rev()
        .map(|(priority, count)| AnalyticsPoint {
            label: priority.as_str().to_string(),
            value: count as f64,
        })
        .collect()
}
