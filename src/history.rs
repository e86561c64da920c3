//! Bounded, time-ordered tick history.
//!
//! Records are kept oldest-first. Appending past capacity evicts the head,
//! so the store always holds the most recent `capacity` samples.

use crate::domain::TickRecord;
use crate::error::HistoryError;
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

/// History shared between the ingestion task and HTTP readers.
pub type SharedHistory = Arc<RwLock<HistoryStore>>;

#[derive(Debug, Clone)]
pub struct HistoryStore {
    records: VecDeque<TickRecord>,
    capacity: usize,
    next_sequence_id: u64,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Result<Self, HistoryError> {
        if capacity == 0 {
            return Err(HistoryError::ZeroCapacity);
        }

        Ok(Self {
            records: VecDeque::new(),
            capacity,
            next_sequence_id: 1,
        })
    }

    pub fn shared(capacity: usize) -> Result<SharedHistory, HistoryError> {
        Ok(Arc::new(RwLock::new(Self::new(capacity)?)))
    }

    /// Push a record to the tail, assigning its sequence id. Evicts the oldest
    /// record when the store is full.
    pub fn append(&mut self, mut record: TickRecord) -> u64 {
        let sequence_id = self.next_sequence_id;
        self.next_sequence_id += 1;
        record.sequence_id = sequence_id;

        self.records.push_back(record);
        if self.records.len() > self.capacity {
            self.records.pop_front();
        }

        sequence_id
    }

    /// Index of the newest record, or 0 when empty.
    pub fn latest_index(&self) -> usize {
        self.records.len().saturating_sub(1)
    }

    pub fn at(&self, index: usize) -> Option<&TickRecord> {
        self.records.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut TickRecord> {
        self.records.get_mut(index)
    }

    pub fn latest(&self) -> Option<&TickRecord> {
        self.records.back()
    }

    /// Handle to the current record. Only valid until the next append.
    pub fn latest_mut(&mut self) -> Option<&mut TickRecord> {
        self.records.back_mut()
    }

    /// The last `n` records (fewer if the store holds less), oldest first.
    pub fn window(&self, n: usize) -> impl Iterator<Item = &TickRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip)
    }

    pub fn snapshot(&self) -> Vec<TickRecord> {
        self.records.iter().cloned().collect()
    }

    /// Drop every record. Sequence ids keep counting from where they were.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
