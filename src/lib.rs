#![warn(rust_2018_idioms)]

pub mod app;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod handler;
pub mod healthcheck;
pub mod history;
pub mod monitor;
pub mod notify;
pub mod retention;
pub mod router;
pub mod snapshot;

pub use domain::{EventRecord, LogHistory, TickRecord, TickSample};
pub use healthcheck::healthcheck_with_port;
pub use history::HistoryStore;
pub use monitor::{MonitorConfig, TickMonitor};
pub use snapshot::SnapshotExporter;
