//! Attaches discrete events and raw log lines to the current record.

use crate::domain::EventRecord;
use crate::history::HistoryStore;
use std::collections::HashMap;
use tracing::debug;

/// Callback invoked for every dispatched event with a matching name.
pub type Subscriber = Box<dyn Fn(&EventRecord) + Send + Sync>;

/// Routes events into the history and out to named subscribers.
///
/// Subscribers for a name run synchronously, in registration order.
#[derive(Default)]
pub struct EventRouter {
    subscribers: HashMap<String, Vec<Subscriber>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&EventRecord) + Send + Sync + 'static,
    {
        self.subscribers
            .entry(name.into())
            .or_default()
            .push(Box::new(handler));
    }

    /// Run the subscribers registered for `event.name`, in registration order.
    pub fn notify(&self, event: &EventRecord) {
        if let Some(handlers) = self.subscribers.get(&event.name) {
            for handler in handlers {
                handler(event);
            }
        }
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("subscribed_names", &self.subscribers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Append an event to the newest record. No-op on an empty store.
pub fn attach(store: &mut HistoryStore, event: EventRecord) -> bool {
    match store.latest_mut() {
        Some(record) => {
            record.events.push(event);
            true
        }
        None => {
            debug!(event = %event.name, "No current record, dropping event");
            false
        }
    }
}

/// Archive a raw log line on the newest record. No-op on an empty store.
pub fn attach_log(store: &mut HistoryStore, raw_line: &str) -> bool {
    match store.latest_mut() {
        Some(record) => {
            record.logs.push(raw_line.to_string());
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TickRecord, TickSample};
    use chrono::Utc;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    fn store_with_one() -> HistoryStore {
        let mut store = HistoryStore::new(3).unwrap();
        store.append(TickRecord::from_sample(TickSample::new(50.0, Utc::now())));
        store
    }

    #[test]
    fn test_attach_on_empty_store_is_noop() {
        let mut store = HistoryStore::new(3).unwrap();
        assert!(!attach(&mut store, EventRecord::new("PLAYER_CONNECTED", json!({}))));
        assert!(!attach_log(&mut store, "a line"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_attach_goes_to_newest_record() {
        let mut store = store_with_one();
        store.append(TickRecord::from_sample(TickSample::new(49.0, Utc::now())));

        assert!(attach(
            &mut store,
            EventRecord::new("NEW_GAME", json!({"layer": "Narva_AAS_v1"}))
        ));
        assert!(store.at(0).unwrap().events.is_empty());
        let newest = store.latest().unwrap();
        assert_eq!(newest.events.len(), 1);
        assert_eq!(newest.events[0].payload["layer"], "Narva_AAS_v1");
    }

    #[test]
    fn test_attach_log_increments_count() {
        let mut store = store_with_one();
        attach_log(&mut store, "first");
        attach_log(&mut store, "second");

        let logs = &store.latest().unwrap().logs;
        assert_eq!(logs.count, 2);
        assert_eq!(logs.history, vec!["first", "second"]);
    }

    #[test]
    fn test_subscribers_run_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut router = EventRouter::new();
        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            router.subscribe("ROUND_ENDED", move |_| seen.lock().unwrap().push(tag));
        }
        router.subscribe("OTHER", |_| panic!("wrong subscriber"));

        router.notify(&EventRecord::new("ROUND_ENDED", Value::Null));

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_notify_without_subscribers_is_noop() {
        let router = EventRouter::new();
        router.notify(&EventRecord::new("PLAYER_CONNECTED", Value::Null));
    }
}
