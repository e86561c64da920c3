use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single server tick-rate measurement as delivered by the sample feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickSample {
    pub tick_rate: f64,
    pub timestamp: DateTime<Utc>,
    /// Source-supplied fields (player count, current layer, ...). Carried verbatim.
    #[serde(default)]
    pub context: Value,
}

impl TickSample {
    pub fn new(tick_rate: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            tick_rate,
            timestamp,
            context: Value::Null,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// A discrete event attached to the record it occurred within.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: String,
    #[serde(default)]
    pub payload: Value,
}

impl EventRecord {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Raw log lines received while a record was the newest.
///
/// `history` may be cleared by the retention pass; `count` never goes down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogHistory {
    pub count: u64,
    pub history: Vec<String>,
}

impl LogHistory {
    pub fn push(&mut self, line: String) {
        self.history.push(line);
        self.count += 1;
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

/// One entry of the bounded performance history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickRecord {
    pub sequence_id: u64,
    pub tick_rate: f64,
    pub average_tick_rate: f64,
    pub timestamp: DateTime<Utc>,
    pub context: Value,
    pub events: Vec<EventRecord>,
    pub logs: LogHistory,
}

impl TickRecord {
    /// Build a fresh record from a sample. The sequence id is assigned by the store on append.
    pub fn from_sample(sample: TickSample) -> Self {
        Self {
            sequence_id: 0,
            tick_rate: sample.tick_rate,
            average_tick_rate: 0.0,
            timestamp: sample.timestamp,
            context: sample.context,
            events: Vec::new(),
            logs: LogHistory::default(),
        }
    }
}
