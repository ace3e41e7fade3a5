use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset::{normalize_symbol, AssetClass};

/// Direction of an investment operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Buying / acquiring units
    Buy,
    /// Selling / disposing of units
    Sell,
    /// Anything else found in stored data. Rejected on write, skipped on read.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Buy => write!(f, "Buy"),
            OperationKind::Sell => write!(f, "Sell"),
            OperationKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A single buy/sell of an investable asset.
///
/// `total_value` is what the trade cost (or returned) in the asset's native
/// currency; the valuation engine never uses it, market prices are fetched
/// for the dates that matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentOperation {
    pub id: Uuid,
    pub user_id: String,
    pub operation: OperationKind,
    pub asset_class: AssetClass,

    /// Ticker, upper-cased (e.g., "AAPL", "VWCE.DE", "BTC")
    pub symbol: String,

    /// Human-readable name (e.g., "Apple Inc.")
    pub display_name: String,

    /// Units bought or sold (always positive)
    pub quantity: Decimal,

    pub total_value: Decimal,

    /// Trade date (daily granularity)
    pub occurred_on: NaiveDate,

    /// Broker / exchange, free text
    #[serde(default)]
    pub venue: Option<String>,

    /// Expense transaction created together with a Buy, if any
    #[serde(default)]
    pub linked_transaction_id: Option<Uuid>,
}

/// Caller-supplied fields for a new or updated investment operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentInput {
    pub operation: OperationKind,
    pub asset_class: AssetClass,
    pub symbol: String,
    pub display_name: String,
    pub quantity: Decimal,
    pub total_value: Decimal,
    pub occurred_on: NaiveDate,
    #[serde(default)]
    pub venue: Option<String>,
    /// For a Buy: also book the purchase as a cash outflow.
    #[serde(default)]
    pub record_cash_outflow: bool,
    /// Currency `total_value` is stated in. Looked up from market data when omitted.
    #[serde(default)]
    pub currency: Option<String>,
}

/// Cash booked for a Buy, already in the reporting currency.
#[derive(Debug, Clone, PartialEq)]
pub struct CashOutflow {
    pub amount: Decimal,
    /// What the trade cost before conversion (e.g., "1000 USD").
    pub native: Option<String>,
}

impl InvestmentOperation {
    pub fn new(user_id: impl Into<String>, input: &InvestmentInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            operation: input.operation,
            asset_class: input.asset_class,
            symbol: normalize_symbol(&input.symbol),
            display_name: input.display_name.trim().to_string(),
            quantity: input.quantity,
            total_value: input.total_value,
            occurred_on: input.occurred_on,
            venue: input.venue.clone(),
            linked_transaction_id: None,
        }
    }

    /// Signed contribution of this operation to the net quantity.
    /// `None` for records the position fold must skip.
    pub fn signed_quantity(&self) -> Option<Decimal> {
        if self.quantity <= Decimal::ZERO {
            return None;
        }
        match self.operation {
            OperationKind::Buy => Some(self.quantity),
            OperationKind::Sell => Some(-self.quantity),
            OperationKind::Unknown => None,
        }
    }
}
