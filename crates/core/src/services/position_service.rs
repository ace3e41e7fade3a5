use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::CoreError;
use crate::models::operation::{InvestmentInput, InvestmentOperation, OperationKind};
use crate::models::position::PositionTable;

/// Rebuilds net positions from investment operations.
///
/// Pure business logic, no I/O. Only net quantities are tracked; there is
/// no notion of lots or cost basis.
pub struct PositionService;

impl PositionService {
    pub fn new() -> Self {
        Self
    }

    /// Net quantity per symbol over the operations dated strictly before `cutoff`.
    ///
    /// The result is unfloored: an oversold symbol shows a negative quantity
    /// here and is ignored by valuation. Malformed records (unknown kind,
    /// non-positive quantity) are skipped with a warning.
    pub fn positions_as_of(
        &self,
        operations: &[InvestmentOperation],
        cutoff: NaiveDate,
    ) -> PositionTable {
        let mut table = PositionTable::new();
        for op in operations.iter().filter(|op| op.occurred_on < cutoff) {
            match op.signed_quantity() {
                Some(delta) => table.adjust(&op.symbol, op.asset_class, delta),
                None => Self::warn_malformed(op),
            }
        }
        table
    }

    /// Apply one operation to a running table, flooring the quantity at zero.
    /// Returns false when the record was skipped as malformed.
    pub fn apply_operation(&self, table: &mut PositionTable, op: &InvestmentOperation) -> bool {
        match op.signed_quantity() {
            Some(delta) => {
                table.adjust_floored(&op.symbol, op.asset_class, delta);
                true
            }
            None => {
                Self::warn_malformed(op);
                false
            }
        }
    }

    /// Write-time checks, so the read path only ever sees well-formed records.
    pub fn validate_operation(&self, input: &InvestmentInput) -> Result<(), CoreError> {
        if input.operation == OperationKind::Unknown {
            return Err(CoreError::ValidationError(
                "Operation must be Buy or Sell".into(),
            ));
        }
        if input.symbol.trim().is_empty() {
            return Err(CoreError::ValidationError("Symbol must not be empty".into()));
        }
        if input.quantity <= Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "Quantity must be positive, got {}",
                input.quantity
            )));
        }
        if input.total_value < Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "Total value must not be negative, got {}",
                input.total_value
            )));
        }
        Ok(())
    }

    fn warn_malformed(op: &InvestmentOperation) {
        log::warn!(
            "Skipping malformed operation {} ({} {} x{} on {})",
            op.id,
            op.operation,
            op.symbol,
            op.quantity,
            op.occurred_on
        );
    }
}

impl Default for PositionService {
    fn default() -> Self {
        Self::new()
    }
}
