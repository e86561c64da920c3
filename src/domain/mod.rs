//! Domain layer for tickwatch.
//!
//! Contains the canonical types shared across all modules:
//! - `TickSample`: one measurement delivered by the sample feed
//! - `TickRecord`: the history entry built from a sample
//! - `EventRecord` / `LogHistory`: what gets attached to the current record

pub mod tick_record;

pub use tick_record::{EventRecord, LogHistory, TickRecord, TickSample};
