use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::WarningKey;

/// Records which one-time warnings already fired. Clones share the ledger.
#[derive(Debug, Clone, Default)]
pub struct WarningLedger {
    sent: Arc<Mutex<HashSet<WarningKey>>>,
}

impl WarningLedger {
    /// Logs the warning for `key` unless it was logged before. Returns
    /// whether it fired now.
    pub fn warn_once(&self, key: WarningKey) -> bool {
        let fresh = self
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        if fresh {
            tracing::warn!(warning = ?key, "{}", key.message());
        }
        fresh
    }

    pub fn has_sent(&self, key: WarningKey) -> bool {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
    }
}
