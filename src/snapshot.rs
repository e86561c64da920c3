//! Read-only access to the history for external readers.

use crate::domain::TickRecord;
use crate::history::SharedHistory;
use serde_json::Value;

/// Cloneable handle that copies the history out under a short read lock.
#[derive(Clone)]
pub struct SnapshotExporter {
    history: SharedHistory,
}

impl SnapshotExporter {
    pub fn new(history: SharedHistory) -> Self {
        Self { history }
    }

    /// Point-in-time copy of every retained record, oldest first.
    pub fn export(&self) -> Vec<TickRecord> {
        self.history.read().snapshot()
    }

    /// The snapshot as a JSON array.
    pub fn export_json(&self) -> Value {
        let records = self.export();
        // Records hold only strings, numbers and JSON values, so this cannot fail
        serde_json::to_value(records).unwrap_or_else(|_| Value::Array(Vec::new()))
    }

    pub fn len(&self) -> usize {
        self.history.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.read().is_empty()
    }
}

impl std::fmt::Debug for SnapshotExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotExporter")
            .field("records", &self.len())
            .finish()
    }
}
