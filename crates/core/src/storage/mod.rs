pub mod json_file;
pub mod memory;

use crate::errors::CoreError;
use crate::models::ledger::Ledger;

pub use json_file::JsonFileLedgerStore;
pub use memory::MemoryLedgerStore;

/// Persistence for per-user ledgers.
///
/// The engine reads one consistent snapshot per computation through
/// [`load`](LedgerStore::load) and writes whole ledgers back. Records are
/// already scoped to the user; stores do no filtering of their own.
pub trait LedgerStore: Send + Sync {
    /// The user's ledger, or an empty one if nothing was stored yet.
    fn load(&self, user_id: &str) -> Result<Ledger, CoreError>;

    /// Replace the stored ledger of `ledger.user_id`.
    fn save(&self, ledger: &Ledger) -> Result<(), CoreError>;

    /// Drop everything stored for the user. Removing an unknown user is not an error.
    fn remove(&self, user_id: &str) -> Result<(), CoreError>;
}

/// Reject user ids that cannot be used as a storage key.
pub(crate) fn validate_user_id(user_id: &str) -> Result<(), CoreError> {
    let valid = !user_id.is_empty()
        && user_id.len() <= 128
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        && !user_id.starts_with('.');
    if !valid {
        return Err(CoreError::ValidationError(format!(
            "Invalid user id '{user_id}': use letters, digits, '-', '_', '.', '@'"
        )));
    }
    Ok(())
}
