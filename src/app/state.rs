use crate::classifier::{PROFILER_ALREADY_STOPPED, PROFILER_EVENT_PREFIX};
use crate::config::Settings;
use crate::error::TickwatchError;
use crate::monitor::{RandomDrop, TickMonitor};
use crate::notify::{ChannelDropSink, Notification, Notifier, TracingNotifier, WebhookNotifier};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Profiler events logged as they are routed.
const LOGGED_PROFILER_STATES: [&str; 3] = ["STARTED", "ENDED", "STOPPED"];

/// Everything the process needs, built from configuration.
pub struct AppState {
    pub monitor: TickMonitor,
    pub notifier: Arc<dyn Notifier>,
    pub notifications_tx: mpsc::UnboundedSender<Notification>,
    pub notifications_rx: mpsc::UnboundedReceiver<Notification>,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> Result<Self, TickwatchError> {
        let notifier: Arc<dyn Notifier> = match &settings.webhook_url {
            Some(url) => match WebhookNotifier::new(url.clone()) {
                Ok(webhook) => Arc::new(webhook),
                Err(e) => {
                    warn!("Failed to create webhook client, falling back to log output: {e}");
                    Arc::new(TracingNotifier)
                }
            },
            None => {
                info!("No webhook configured, notifications go to the log");
                Arc::new(TracingNotifier)
            }
        };

        let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();

        let monitor = TickMonitor::new(settings.monitor_config())?
            .with_drop_sink(ChannelDropSink::new(notifications_tx.clone()));
        let mut monitor = if settings.simulate_drop_probability > 0.0 {
            warn!(
                probability = settings.simulate_drop_probability,
                "Simulated tick drops enabled"
            );
            monitor.with_fault_injector(RandomDrop::new(settings.simulate_drop_probability))
        } else {
            monitor
        };

        let router = monitor.router_mut();
        for state in LOGGED_PROFILER_STATES {
            router.subscribe(format!("{PROFILER_EVENT_PREFIX}{state}"), |event| {
                info!(event = %event.name, payload = %event.payload, "CSV profiler state changed");
            });
        }
        router.subscribe(PROFILER_ALREADY_STOPPED, |_| {
            warn!("CSV profiler stop requested while no capture was running");
        });

        Ok(Self {
            monitor,
            notifier,
            notifications_tx,
            notifications_rx,
        })
    }
}
