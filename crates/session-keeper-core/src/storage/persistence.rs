use std::sync::Arc;

use tracing::{debug, warn};

use super::{KeyValueStorage, StorageError};
use crate::auth::{PersistedRecord, Session};

/// Fixed storage key for the persisted session.
pub const SESSION_KEY: &str = "userData";

/// Reads and writes the single persisted session record.
#[derive(Clone)]
pub struct SessionPersistence {
    storage: Arc<dyn KeyValueStorage>,
}

impl SessionPersistence {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Overwrite the stored record with `session`.
    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        let record = PersistedRecord::from(session);
        let contents = serde_json::to_string(&record)?;
        self.storage.set(SESSION_KEY, &contents)?;
        debug!(email = %record.email, "Session persisted");
        Ok(())
    }

    /// Read the stored record. Missing, unreadable and malformed data all yield `None`.
    pub fn load(&self) -> Option<PersistedRecord> {
        let contents = match self.storage.get(SESSION_KEY) {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed persisted session");
                None
            }
        }
    }

    /// Remove the stored record. Removing an absent record is not an error.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(SESSION_KEY) {
            warn!(error = %e, "Failed to remove persisted session");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
