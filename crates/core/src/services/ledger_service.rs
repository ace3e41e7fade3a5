use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::ledger::{
    Account, CashTransaction, Category, CategoryInput, Ledger, OnboardingData, TransactionInput,
    TransactionKind,
};
use crate::models::operation::{CashOutflow, InvestmentInput, InvestmentOperation, OperationKind};
use crate::services::position_service::PositionService;

/// Write-side rules for a user's ledger: onboarding, cash transactions,
/// investment operations and the Buy → cash outflow link between them.
///
/// Pure business logic on an in-memory [`Ledger`]; persisting it is the
/// caller's job. Every mutation validates first, so a rejected call leaves
/// the ledger untouched.
pub struct LedgerService {
    position_service: PositionService,
}

impl LedgerService {
    pub fn new() -> Self {
        Self {
            position_service: PositionService::new(),
        }
    }

    // ── Onboarding ──────────────────────────────────────────────────

    /// Set the cash baseline and create the user's categories.
    /// Re-running onboarding replaces the account and appends categories.
    pub fn complete_onboarding(
        &self,
        ledger: &mut Ledger,
        data: &OnboardingData,
    ) -> Result<(), CoreError> {
        if data.initial_balance < Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "Initial balance must not be negative, got {}",
                data.initial_balance
            )));
        }
        let inputs = data
            .expense_categories
            .iter()
            .map(|c| (TransactionKind::Expense, c))
            .chain(
                data.income_categories
                    .iter()
                    .map(|c| (TransactionKind::Income, c)),
            );
        let mut categories = Vec::new();
        for (kind, input) in inputs {
            categories.push(Self::build_category(&ledger.user_id, kind, input)?);
        }

        ledger.account = Some(Account {
            user_id: ledger.user_id.clone(),
            initial_balance: data.initial_balance,
        });
        ledger.categories.extend(categories);
        Ok(())
    }

    fn build_category(
        user_id: &str,
        kind: TransactionKind,
        input: &CategoryInput,
    ) -> Result<Category, CoreError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(CoreError::ValidationError(
                "Category name must not be empty".into(),
            ));
        }
        Ok(Category {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            kind,
            name: name.to_string(),
            icon: input.icon.trim().to_string(),
        })
    }

    /// Categories of one kind (or all), in creation order.
    pub fn list_categories<'a>(
        &self,
        ledger: &'a Ledger,
        kind: Option<TransactionKind>,
    ) -> Vec<&'a Category> {
        ledger
            .categories
            .iter()
            .filter(|c| kind.map_or(true, |k| c.kind == k))
            .collect()
    }

    // ── Cash transactions ───────────────────────────────────────────

    pub fn add_transaction(
        &self,
        ledger: &mut Ledger,
        input: &TransactionInput,
    ) -> Result<CashTransaction, CoreError> {
        self.validate_transaction(ledger, input)?;
        let tx = CashTransaction::new(ledger.user_id.clone(), input);
        Self::insert_transaction(ledger, tx.clone());
        Ok(tx)
    }

    pub fn update_transaction(
        &self,
        ledger: &mut Ledger,
        id: Uuid,
        input: &TransactionInput,
    ) -> Result<CashTransaction, CoreError> {
        self.validate_transaction(ledger, input)?;
        let idx = Self::transaction_index(ledger, id)?;
        let old = ledger.transactions.remove(idx);
        let updated = CashTransaction {
            id: old.id,
            ..CashTransaction::new(old.user_id, input)
        };
        Self::insert_transaction(ledger, updated.clone());
        Ok(updated)
    }

    /// Delete a transaction. An operation linked to it keeps existing, unlinked.
    pub fn delete_transaction(&self, ledger: &mut Ledger, id: Uuid) -> Result<(), CoreError> {
        let idx = Self::transaction_index(ledger, id)?;
        ledger.transactions.remove(idx);
        for op in ledger
            .operations
            .iter_mut()
            .filter(|op| op.linked_transaction_id == Some(id))
        {
            op.linked_transaction_id = None;
        }
        Ok(())
    }

    /// Transactions, newest first.
    pub fn list_transactions<'a>(&self, ledger: &'a Ledger) -> Vec<&'a CashTransaction> {
        ledger.transactions.iter().rev().collect()
    }

    fn validate_transaction(
        &self,
        ledger: &Ledger,
        input: &TransactionInput,
    ) -> Result<(), CoreError> {
        if input.amount <= Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "Amount must be positive, got {}",
                input.amount
            )));
        }
        if let Some(category_id) = input.category_id {
            let category = ledger
                .categories
                .iter()
                .find(|c| c.id == category_id)
                .ok_or_else(|| CoreError::RecordNotFound(format!("category {category_id}")))?;
            if category.kind != input.kind {
                return Err(CoreError::ValidationError(format!(
                    "Category '{}' is an {} category, transaction is {}",
                    category.name, category.kind, input.kind
                )));
            }
        }
        Ok(())
    }

    fn transaction_index(ledger: &Ledger, id: Uuid) -> Result<usize, CoreError> {
        ledger
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::RecordNotFound(format!("transaction {id}")))
    }

    // Keeps date order; a record lands after existing ones on the same date.
    fn insert_transaction(ledger: &mut Ledger, tx: CashTransaction) {
        let pos = ledger
            .transactions
            .partition_point(|t| t.occurred_on <= tx.occurred_on);
        ledger.transactions.insert(pos, tx);
    }

    // ── Investment operations ───────────────────────────────────────

    /// Record a buy or sell. A Buy with `record_cash_outflow` also books an
    /// Expense of `total_value` on the same date and links it.
    pub fn add_operation(
        &self,
        ledger: &mut Ledger,
        input: &InvestmentInput,
    ) -> Result<InvestmentOperation, CoreError> {
        self.add_operation_with_outflow(ledger, input, None)
    }

    /// Like [`add_operation`](Self::add_operation), booking `outflow` instead
    /// of `total_value` when given.
    pub fn add_operation_with_outflow(
        &self,
        ledger: &mut Ledger,
        input: &InvestmentInput,
        outflow: Option<&CashOutflow>,
    ) -> Result<InvestmentOperation, CoreError> {
        self.position_service.validate_operation(input)?;
        Self::validate_outflow(input, input.record_cash_outflow)?;
        let mut op = InvestmentOperation::new(ledger.user_id.clone(), input);

        if op.operation == OperationKind::Buy && input.record_cash_outflow {
            let tx = CashTransaction::new(
                ledger.user_id.clone(),
                &Self::outflow_input(&op, outflow),
            );
            op.linked_transaction_id = Some(tx.id);
            Self::insert_transaction(ledger, tx);
        }

        Self::insert_operation(ledger, op.clone());
        Ok(op)
    }

    /// Update an operation and keep its linked transaction in step:
    /// - still a Buy: the linked expense follows amount, date and description;
    /// - now a Sell: the linked expense is removed;
    /// - a Buy without a link gets one if `record_cash_outflow` is set.
    pub fn update_operation(
        &self,
        ledger: &mut Ledger,
        id: Uuid,
        input: &InvestmentInput,
    ) -> Result<InvestmentOperation, CoreError> {
        self.update_operation_with_outflow(ledger, id, input, None)
    }

    /// Like [`update_operation`](Self::update_operation), booking `outflow`
    /// instead of `total_value` when given.
    pub fn update_operation_with_outflow(
        &self,
        ledger: &mut Ledger,
        id: Uuid,
        input: &InvestmentInput,
        outflow: Option<&CashOutflow>,
    ) -> Result<InvestmentOperation, CoreError> {
        self.position_service.validate_operation(input)?;
        let idx = Self::operation_index(ledger, id)?;
        let linked = ledger.operations[idx].linked_transaction_id.is_some();
        Self::validate_outflow(input, linked || input.record_cash_outflow)?;
        let old = ledger.operations.remove(idx);

        let mut updated = InvestmentOperation {
            id: old.id,
            linked_transaction_id: old.linked_transaction_id,
            ..InvestmentOperation::new(old.user_id.clone(), input)
        };

        match (updated.operation, updated.linked_transaction_id) {
            (OperationKind::Buy, Some(tx_id)) => {
                let booking = Self::outflow_input(&updated, outflow);
                match Self::transaction_index(ledger, tx_id) {
                    Ok(tx_idx) => {
                        let tx = ledger.transactions.remove(tx_idx);
                        let tx = CashTransaction {
                            id: tx.id,
                            category_id: tx.category_id,
                            ..CashTransaction::new(tx.user_id, &booking)
                        };
                        Self::insert_transaction(ledger, tx);
                    }
                    Err(_) => {
                        log::warn!(
                            "Operation {id} linked to missing transaction {tx_id}; unlinking"
                        );
                        updated.linked_transaction_id = None;
                    }
                }
            }
            (OperationKind::Buy, None) if input.record_cash_outflow => {
                let booking = Self::outflow_input(&updated, outflow);
                let tx = CashTransaction::new(ledger.user_id.clone(), &booking);
                updated.linked_transaction_id = Some(tx.id);
                Self::insert_transaction(ledger, tx);
            }
            (_, Some(tx_id)) => {
                ledger.transactions.retain(|t| t.id != tx_id);
                updated.linked_transaction_id = None;
            }
            _ => {}
        }

        Self::insert_operation(ledger, updated.clone());
        Ok(updated)
    }

    /// Delete an operation together with its linked transaction.
    pub fn delete_operation(&self, ledger: &mut Ledger, id: Uuid) -> Result<(), CoreError> {
        let idx = Self::operation_index(ledger, id)?;
        let removed = ledger.operations.remove(idx);
        if let Some(tx_id) = removed.linked_transaction_id {
            ledger.transactions.retain(|t| t.id != tx_id);
        }
        Ok(())
    }

    /// Operations, newest first.
    pub fn list_operations<'a>(&self, ledger: &'a Ledger) -> Vec<&'a InvestmentOperation> {
        ledger.operations.iter().rev().collect()
    }

    fn operation_index(ledger: &Ledger, id: Uuid) -> Result<usize, CoreError> {
        ledger
            .operations
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| CoreError::RecordNotFound(format!("operation {id}")))
    }

    fn insert_operation(ledger: &mut Ledger, op: InvestmentOperation) {
        let pos = ledger
            .operations
            .partition_point(|o| o.occurred_on <= op.occurred_on);
        ledger.operations.insert(pos, op);
    }

    // A Buy that books (or keeps) a cash outflow needs something to book.
    fn validate_outflow(input: &InvestmentInput, books_outflow: bool) -> Result<(), CoreError> {
        if input.operation == OperationKind::Buy
            && books_outflow
            && input.total_value <= Decimal::ZERO
        {
            return Err(CoreError::ValidationError(
                "A Buy recorded as a cash outflow needs a positive total value".into(),
            ));
        }
        Ok(())
    }

    fn outflow_input(op: &InvestmentOperation, outflow: Option<&CashOutflow>) -> TransactionInput {
        let mut description = format!("Buy {} {}", op.quantity.normalize(), op.symbol);
        if let Some(native) = outflow.and_then(|o| o.native.as_deref()) {
            description.push_str(&format!(" ({native})"));
        }
        TransactionInput {
            kind: TransactionKind::Expense,
            amount: outflow.map_or(op.total_value, |o| o.amount),
            description,
            category_id: None,
            occurred_on: op.occurred_on,
        }
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new()
    }
}
