//! Outbound delivery of drop alerts and round exports.

pub mod webhook;

use crate::domain::TickRecord;
use crate::monitor::DropSink;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use webhook::WebhookNotifier;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook returned status: {status}")]
    Status { status: u16 },
}

/// Something the monitor wants delivered outside the process.
#[derive(Debug, Clone)]
pub enum Notification {
    Drop(TickRecord),
    Export(Vec<TickRecord>),
}

/// Delivery channel for notifications (chat webhook, log, ...).
///
/// This trait is dyn-compatible by using boxed futures instead of `impl Future`.
pub trait Notifier: Send + Sync {
    fn notify_drop(
        &self,
        record: TickRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>>;

    fn deliver_export(
        &self,
        records: Vec<TickRecord>,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>>;
}

/// Writes notifications to the application log when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_drop(
        &self,
        record: TickRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
        Box::pin(async move {
            warn!(
                sequence_id = record.sequence_id,
                tick_rate = record.tick_rate,
                average_tick_rate = record.average_tick_rate,
                "TPS drop"
            );
            Ok(())
        })
    }

    fn deliver_export(
        &self,
        records: Vec<TickRecord>,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
        Box::pin(async move {
            info!(records = records.len(), "Round history export");
            Ok(())
        })
    }
}

/// Forwards drop records into the notification channel without blocking ingestion.
#[derive(Debug, Clone)]
pub struct ChannelDropSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelDropSink {
    pub fn new(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx }
    }
}

impl DropSink for ChannelDropSink {
    fn on_drop(&self, record: &TickRecord) {
        if self.tx.send(Notification::Drop(record.clone())).is_err() {
            warn!("Notification dispatcher stopped, drop alert discarded");
        }
    }
}

/// Deliver every notification from `rx` until all senders are gone.
///
/// Delivery failures are logged and never retried.
pub fn spawn_dispatcher(
    notifier: Arc<dyn Notifier>,
    mut rx: mpsc::UnboundedReceiver<Notification>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notification) = rx.recv().await {
            let result = match notification {
                Notification::Drop(record) => notifier.notify_drop(record).await,
                Notification::Export(records) => notifier.deliver_export(records).await,
            };
            if let Err(e) = result {
                error!("Failed to deliver notification: {e}");
            }
        }
        info!("Notification dispatcher finished");
    })
}
