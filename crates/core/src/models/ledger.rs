use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::operation::InvestmentOperation;

/// Income or expense. Shared by cash transactions and categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Income => write!(f, "income"),
            TransactionKind::Expense => write!(f, "expense"),
        }
    }
}

/// A single cash movement on the user's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashTransaction {
    pub id: Uuid,
    pub user_id: String,
    pub kind: TransactionKind,

    /// Always positive; the direction comes from `kind`
    pub amount: Decimal,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category_id: Option<Uuid>,

    /// Booking date (no time of day)
    pub occurred_on: NaiveDate,
}

/// Caller-supplied fields for a new or updated cash transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub kind: TransactionKind,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    pub occurred_on: NaiveDate,
}

impl CashTransaction {
    pub fn new(user_id: impl Into<String>, input: &TransactionInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            kind: input.kind,
            amount: input.amount,
            description: input.description.trim().to_string(),
            category_id: input.category_id,
            occurred_on: input.occurred_on,
        }
    }

    /// Effect on the cash balance: +amount for income, -amount for expense.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

/// The user's cash baseline, set once during onboarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub initial_balance: Decimal,
}

/// A label for transactions. Plays no part in valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub user_id: String,
    pub kind: TransactionKind,
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub icon: String,
}

/// Everything collected by the onboarding flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingData {
    pub initial_balance: Decimal,
    #[serde(default)]
    pub expense_categories: Vec<CategoryInput>,
    #[serde(default)]
    pub income_categories: Vec<CategoryInput>,
}

/// All records owned by one user: the snapshot the engine reads and the
/// unit the ledger store persists.
///
/// `transactions` and `operations` are kept sorted by `occurred_on`,
/// oldest first; records sharing a date keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub user_id: String,

    #[serde(default)]
    pub account: Option<Account>,

    #[serde(default)]
    pub categories: Vec<Category>,

    #[serde(default)]
    pub transactions: Vec<CashTransaction>,

    #[serde(default)]
    pub operations: Vec<InvestmentOperation>,
}

impl Ledger {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Cash baseline, zero before onboarding.
    pub fn initial_balance(&self) -> Decimal {
        self.account
            .as_ref()
            .map(|a| a.initial_balance)
            .unwrap_or(Decimal::ZERO)
    }

    /// Date of the earliest transaction or operation, if any record exists.
    pub fn earliest_record_date(&self) -> Option<NaiveDate> {
        let tx = self.transactions.iter().map(|t| t.occurred_on).min();
        let op = self.operations.iter().map(|o| o.occurred_on).min();
        match (tx, op) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.account.is_none()
            && self.categories.is_empty()
            && self.transactions.is_empty()
            && self.operations.is_empty()
    }

    /// Cash on hand at the end of `date`: the baseline plus every transaction
    /// booked on or before it.
    pub fn cash_balance_as_of(&self, date: NaiveDate) -> Decimal {
        self.initial_balance()
            + self
                .transactions
                .iter()
                .filter(|t| t.occurred_on <= date)
                .map(|t| t.signed_amount())
                .sum::<Decimal>()
    }

    /// Sum of transactions of `kind` dated within `[from, to]`.
    pub fn total_in_range(&self, kind: TransactionKind, from: NaiveDate, to: NaiveDate) -> Decimal {
        self.transactions
            .iter()
            .filter(|t| t.kind == kind && t.occurred_on >= from && t.occurred_on <= to)
            .map(|t| t.amount)
            .sum()
    }
}
