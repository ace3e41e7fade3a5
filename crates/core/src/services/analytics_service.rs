use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::analytics::DashboardSummary;
use crate::models::ledger::{Ledger, TransactionKind};
use crate::models::valuation::NetWorthPoint;

/// Length of the dashboard comparison window, in days.
pub const PERIOD_DAYS: u64 = 30;

/// Period-over-period change in percent, full precision.
///
/// A zero baseline saturates: 100.0 when `current` is positive, 0.0
/// otherwise.
pub fn percentage_change(current: Decimal, previous: Decimal) -> f64 {
    if previous.is_zero() {
        return if current > Decimal::ZERO { 100.0 } else { 0.0 };
    }
    (current - previous)
        .checked_div(previous)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|pct| pct.to_f64())
        .unwrap_or(0.0)
}

/// Round a percentage to 2 decimals for presentation.
pub fn round_pct(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Headline dashboard figures.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// Build the dashboard summary for `today` from a net-worth series
    /// covering `[today-30, today]`.
    ///
    /// Windows: the last 30 days are `[today-29, today]`, the previous period
    /// is `[today-59, today-30]`. "Now" and "30 days ago" are the series
    /// points on `today` and `today-30`; a missing point reads as zero.
    pub fn dashboard_summary(
        &self,
        ledger: &Ledger,
        today: NaiveDate,
        series: &[NetWorthPoint],
    ) -> DashboardSummary {
        let day = |n: u64| today.checked_sub_days(Days::new(n)).unwrap_or(NaiveDate::MIN);

        let current_from = day(PERIOD_DAYS - 1);
        let previous_from = day(2 * PERIOD_DAYS - 1);
        let previous_to = day(PERIOD_DAYS);

        let income_now = ledger.total_in_range(TransactionKind::Income, current_from, today);
        let income_before =
            ledger.total_in_range(TransactionKind::Income, previous_from, previous_to);
        let expense_now = ledger.total_in_range(TransactionKind::Expense, current_from, today);
        let expense_before =
            ledger.total_in_range(TransactionKind::Expense, previous_from, previous_to);

        let point_on = |date: NaiveDate| {
            series
                .iter()
                .find(|p| p.date == date)
                .cloned()
                .unwrap_or_else(|| NetWorthPoint::zero(date))
        };
        let now = point_on(today);
        let past = point_on(previous_to);

        DashboardSummary {
            net_worth: now.net_worth.round_dp(2),
            income_last_30_days: income_now.round_dp(2),
            income_change_pct: round_pct(percentage_change(income_now, income_before)),
            expense_last_30_days: expense_now.round_dp(2),
            expense_change_pct: round_pct(percentage_change(expense_now, expense_before)),
            net_worth_change_pct: round_pct(percentage_change(now.net_worth, past.net_worth)),
            investment_value_now: now.investment_value.round_dp(2),
            investment_value_30_days_ago: past.investment_value.round_dp(2),
            estimated_fx: now.estimated_fx || past.estimated_fx,
        }
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}
