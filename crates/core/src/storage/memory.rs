use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::CoreError;
use crate::models::ledger::Ledger;

use super::{validate_user_id, LedgerStore};

/// In-memory ledger store, for tests and embedding.
pub struct MemoryLedgerStore {
    ledgers: RwLock<HashMap<String, Ledger>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            ledgers: RwLock::new(HashMap::new()),
        }
    }

    /// Number of users with a stored ledger.
    pub fn len(&self) -> usize {
        self.ledgers.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> CoreError {
    CoreError::FileIO("ledger store lock poisoned".into())
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self, user_id: &str) -> Result<Ledger, CoreError> {
        validate_user_id(user_id)?;
        let ledgers = self.ledgers.read().map_err(|_| poisoned())?;
        Ok(ledgers
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| Ledger::new(user_id)))
    }

    fn save(&self, ledger: &Ledger) -> Result<(), CoreError> {
        validate_user_id(&ledger.user_id)?;
        let mut ledgers = self.ledgers.write().map_err(|_| poisoned())?;
        ledgers.insert(ledger.user_id.clone(), ledger.clone());
        Ok(())
    }

    fn remove(&self, user_id: &str) -> Result<(), CoreError> {
        validate_user_id(user_id)?;
        let mut ledgers = self.ledgers.write().map_err(|_| poisoned())?;
        ledgers.remove(user_id);
        Ok(())
    }
}
