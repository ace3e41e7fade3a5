use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Headline figures for the dashboard. Money rounded to 2 decimals,
/// percentages to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Cash balance plus investment value today
    pub net_worth: Decimal,

    /// Income booked in the last 30 days (today included)
    pub income_last_30_days: Decimal,

    /// Change against the 30 days before that
    pub income_change_pct: f64,

    pub expense_last_30_days: Decimal,
    pub expense_change_pct: f64,

    /// Change of net worth against 30 days ago
    pub net_worth_change_pct: f64,

    pub investment_value_now: Decimal,
    pub investment_value_30_days_ago: Decimal,

    /// True when some conversion fell back to a fixed FX rate
    #[serde(default)]
    pub estimated_fx: bool,
}
