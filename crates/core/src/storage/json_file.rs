use std::path::{Path, PathBuf};

use crate::errors::CoreError;
use crate::models::ledger::Ledger;

use super::{validate_user_id, LedgerStore};

/// Ledger store keeping one pretty-printed JSON file per user:
///
/// ```text
/// <base>/
///   ledgers/
///     <user_id>.json
/// ```
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash mid-write never leaves a truncated ledger behind.
pub struct JsonFileLedgerStore {
    base_path: PathBuf,
}

impl JsonFileLedgerStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn ledgers_dir(&self) -> PathBuf {
        self.base_path.join("ledgers")
    }

    fn ledger_file(&self, user_id: &str) -> PathBuf {
        self.ledgers_dir().join(format!("{user_id}.json"))
    }
}

impl LedgerStore for JsonFileLedgerStore {
    fn load(&self, user_id: &str) -> Result<Ledger, CoreError> {
        validate_user_id(user_id)?;
        let path = self.ledger_file(user_id);
        if !path.exists() {
            return Ok(Ledger::new(user_id));
        }

        let json = std::fs::read_to_string(&path)?;
        let ledger: Ledger = serde_json::from_str(&json).map_err(|e| {
            CoreError::Deserialization(format!("Failed to parse {}: {e}", path.display()))
        })?;

        if ledger.user_id != user_id {
            return Err(CoreError::Deserialization(format!(
                "{} belongs to '{}', expected '{user_id}'",
                path.display(),
                ledger.user_id
            )));
        }
        Ok(ledger)
    }

    fn save(&self, ledger: &Ledger) -> Result<(), CoreError> {
        validate_user_id(&ledger.user_id)?;
        std::fs::create_dir_all(self.ledgers_dir())?;

        let json = serde_json::to_string_pretty(ledger)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))?;

        let path = self.ledger_file(&ledger.user_id);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        log::debug!("Saved ledger for {} to {}", ledger.user_id, path.display());
        Ok(())
    }

    fn remove(&self, user_id: &str) -> Result<(), CoreError> {
        validate_user_id(user_id)?;
        match std::fs::remove_file(self.ledger_file(user_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
