use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::asset::AssetClass;

/// Value of one held position in the reporting currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingValue {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub quantity: Decimal,

    /// Unit price in the asset's native currency (possibly backward-filled)
    pub price: Decimal,
    pub native_currency: String,

    /// Date the price actually comes from
    pub price_date: NaiveDate,

    /// quantity × price × fx, in the reporting currency
    pub value: Decimal,
}

/// Portfolio value at a date, in one reporting currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub as_of: NaiveDate,
    pub currency: String,
    pub total: Decimal,

    /// Value per asset class. Classes with no held position are absent.
    pub breakdown: BTreeMap<AssetClass, Decimal>,

    pub holdings: Vec<HoldingValue>,

    /// Held symbols that contributed nothing (no price / no rate).
    pub skipped: Vec<String>,

    /// Set when any conversion used a fallback rate instead of market data.
    pub estimated_fx: bool,
}

impl Valuation {
    pub fn empty(as_of: NaiveDate, currency: impl Into<String>) -> Self {
        Self {
            as_of,
            currency: currency.into(),
            total: Decimal::ZERO,
            breakdown: BTreeMap::new(),
            holdings: Vec::new(),
            skipped: Vec::new(),
            estimated_fx: false,
        }
    }

    /// Breakdown bucket, zero when the class is not held.
    pub fn class_value_or_zero(&self, asset_class: AssetClass) -> Decimal {
        self.breakdown
            .get(&asset_class)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

/// One day of the net-worth series, full precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetWorthPoint {
    pub date: NaiveDate,
    pub net_worth: Decimal,
    pub investment_value: Decimal,
    #[serde(default)]
    pub estimated_fx: bool,
}

impl NetWorthPoint {
    pub fn zero(date: NaiveDate) -> Self {
        Self {
            date,
            net_worth: Decimal::ZERO,
            investment_value: Decimal::ZERO,
            estimated_fx: false,
        }
    }
}

/// History endpoint row: ISO date, values rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: String,
    pub networth: Decimal,
    pub investments: Decimal,
}

impl From<&NetWorthPoint> for HistoryPoint {
    fn from(p: &NetWorthPoint) -> Self {
        Self {
            date: p.date.format("%Y-%m-%d").to_string(),
            networth: p.net_worth.round_dp(2),
            investments: p.investment_value.round_dp(2),
        }
    }
}
