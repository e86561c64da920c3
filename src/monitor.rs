//! Sample ingestion: rolling average, drop detection and lagged log retention.

use crate::classifier::LogClassifier;
use crate::domain::{EventRecord, TickRecord, TickSample};
use crate::error::TickwatchError;
use crate::history::{HistoryStore, SharedHistory};
use crate::retention;
use crate::router::{self, EventRouter};
use crate::snapshot::SnapshotExporter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

pub const DEFAULT_CAPACITY: usize = 600;
pub const DEFAULT_AVERAGE_WINDOW: usize = 10;
pub const DEFAULT_DROP_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub capacity: usize,
    /// Number of trailing samples in the rolling average.
    pub average_window: usize,
    /// A sample below `previous * drop_threshold` counts as a drop.
    pub drop_threshold: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            average_window: DEFAULT_AVERAGE_WINDOW,
            drop_threshold: DEFAULT_DROP_THRESHOLD,
        }
    }
}

/// Receives the newest record whenever a drop is detected.
///
/// Called synchronously from `ingest`, after the history lock is released.
pub trait DropSink: Send + Sync {
    fn on_drop(&self, record: &TickRecord);
}

impl<F> DropSink for F
where
    F: Fn(&TickRecord) + Send + Sync,
{
    fn on_drop(&self, record: &TickRecord) {
        self(record)
    }
}

/// Rewrites incoming tick rates, used to exercise the drop detector.
pub trait FaultInjector: Send {
    fn apply(&mut self, tick_rate: f64) -> f64;
}

/// Passes every tick rate through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFault;

impl FaultInjector for NoFault {
    fn apply(&mut self, tick_rate: f64) -> f64 {
        tick_rate
    }
}

/// With the given probability, scales a sample down to 10-50% of its value.
#[derive(Debug)]
pub struct RandomDrop {
    probability: f64,
    rng: StdRng,
}

impl RandomDrop {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(probability: f64, seed: u64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl FaultInjector for RandomDrop {
    fn apply(&mut self, tick_rate: f64) -> f64 {
        if self.rng.random_bool(self.probability) {
            let simulated = tick_rate * self.rng.random_range(0.1..0.5);
            debug!(original = tick_rate, simulated, "Simulating tick drop");
            simulated
        } else {
            tick_rate
        }
    }
}

/// Result of ingesting one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub sequence_id: u64,
    pub tick_rate: f64,
    pub average_tick_rate: f64,
    pub dropped: bool,
    pub logs_discarded: bool,
}

/// Mean tick rate over the last `window` records, or 0 when empty.
pub fn rolling_average(store: &HistoryStore, window: usize) -> f64 {
    let (sum, count) = store
        .window(window)
        .fold((0.0, 0usize), |(sum, count), r| (sum + r.tick_rate, count + 1));

    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Strict comparison: landing exactly on the threshold is not a drop.
pub fn is_drop(previous: f64, current: f64, drop_threshold: f64) -> bool {
    previous * drop_threshold > current
}

/// Owns the ingestion side of the history.
///
/// A single task drives the monitor; readers only ever see copies taken
/// through the [`SnapshotExporter`].
pub struct TickMonitor {
    config: MonitorConfig,
    history: SharedHistory,
    router: EventRouter,
    classifier: LogClassifier,
    drop_sink: Option<Box<dyn DropSink>>,
    fault: Box<dyn FaultInjector>,
}

impl TickMonitor {
    pub fn new(config: MonitorConfig) -> Result<Self, TickwatchError> {
        let history = HistoryStore::shared(config.capacity)?;
        let classifier = LogClassifier::with_default_rules()?;

        Ok(Self {
            config,
            history,
            router: EventRouter::new(),
            classifier,
            drop_sink: None,
            fault: Box::new(NoFault),
        })
    }

    #[must_use]
    pub fn with_drop_sink<S: DropSink + 'static>(mut self, sink: S) -> Self {
        self.drop_sink = Some(Box::new(sink));
        self
    }

    #[must_use]
    pub fn with_fault_injector<F: FaultInjector + 'static>(mut self, fault: F) -> Self {
        self.fault = Box::new(fault);
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: LogClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn router_mut(&mut self) -> &mut EventRouter {
        &mut self.router
    }

    pub fn exporter(&self) -> SnapshotExporter {
        SnapshotExporter::new(self.history.clone())
    }

    pub fn len(&self) -> usize {
        self.history.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.read().is_empty()
    }

    /// Record a new sample and run drop detection and retention against it.
    pub fn ingest(&mut self, sample: TickSample) -> IngestOutcome {
        let tick_rate = self.fault.apply(sample.tick_rate);
        let record = TickRecord::from_sample(TickSample { tick_rate, ..sample });

        let (outcome, dropped_record) = {
            let mut store = self.history.write();
            let sequence_id = store.append(record);

            let average = rolling_average(&store, self.config.average_window);
            if let Some(current) = store.latest_mut() {
                current.average_tick_rate = average;
            }

            let previous_index = store.latest_index().checked_sub(1);
            let dropped = previous_index
                .and_then(|i| store.at(i))
                .is_some_and(|previous| {
                    is_drop(previous.tick_rate, tick_rate, self.config.drop_threshold)
                });

            // Lags one tick so the record under review has both neighbours
            let logs_discarded = previous_index
                .is_some_and(|i| retention::apply(&mut store, i, self.config.drop_threshold));

            let dropped_record = if dropped { store.latest().cloned() } else { None };
            let outcome = IngestOutcome {
                sequence_id,
                tick_rate,
                average_tick_rate: average,
                dropped,
                logs_discarded,
            };
            (outcome, dropped_record)
        };

        if let Some(record) = dropped_record {
            warn!(
                sequence_id = record.sequence_id,
                tick_rate = record.tick_rate,
                average_tick_rate = record.average_tick_rate,
                "Tick rate drop detected"
            );
            if let Some(sink) = &self.drop_sink {
                sink.on_drop(&record);
            }
        }

        outcome
    }

    /// Route a discrete event to its subscribers and the current record.
    pub fn dispatch_event(&mut self, event: EventRecord) -> bool {
        self.router.notify(&event);
        let mut store = self.history.write();
        router::attach(&mut store, event)
    }

    /// Archive a raw log line and route any event it classifies to.
    ///
    /// Returns the name of the synthetic event, if one was produced.
    pub fn handle_log_line(&mut self, line: &str) -> Option<String> {
        let event = self.classifier.classify(line);
        router::attach_log(&mut self.history.write(), line);

        event.map(|event| {
            let name = event.name.clone();
            self.dispatch_event(event);
            name
        })
    }

    /// Hand out the whole history and start over with an empty store.
    pub fn drain(&mut self) -> Vec<TickRecord> {
        let mut store = self.history.write();
        let records = store.snapshot();
        store.clear();
        records
    }
}

impl std::fmt::Debug for TickMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickMonitor")
            .field("config", &self.config)
            .field("router", &self.router)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}
