//! Raw-log retention around tick drops.
//!
//! Log lines are only worth keeping for records near a drop. Once a record's
//! predecessor and successor are both known and neither comparison shows a
//! drop, its `logs.history` is discarded. `logs.count` is left untouched.

use crate::history::HistoryStore;
use tracing::debug;

/// Returns true when the record at `index` sits in a stable window.
pub fn is_stable(store: &HistoryStore, index: usize, drop_threshold: f64) -> bool {
    if store.len() <= 1 {
        return false;
    }
    let Some(prev_index) = index.checked_sub(1) else {
        return false;
    };
    let (Some(prev), Some(current), Some(next)) = (
        store.at(prev_index),
        store.at(index),
        store.at(index + 1),
    ) else {
        return false;
    };

    prev.tick_rate * drop_threshold < current.tick_rate
        && current.tick_rate * drop_threshold < next.tick_rate
}

/// Clear the log history of the record at `index` if it is stable.
///
/// Out-of-range indices are a no-op. Returns whether anything was cleared.
pub fn apply(store: &mut HistoryStore, index: usize, drop_threshold: f64) -> bool {
    if !is_stable(store, index, drop_threshold) {
        return false;
    }

    match store.at_mut(index) {
        Some(record) => {
            debug!(
                sequence_id = record.sequence_id,
                discarded = record.logs.history.len(),
                "Discarding log detail for stable record"
            );
            record.logs.clear_history();
            true
        }
        None => false,
    }
}
