use super::{Notifier, NotifyError};
use crate::domain::TickRecord;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::info;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DROP_COLOR: u32 = 0x00E7_4C3C;
const EXPORT_COLOR: u32 = 0x0034_98DB;

/// Posts Discord-style webhook messages.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn post(&self, body: &Value) -> Result<(), NotifyError> {
        let resp = self.client.post(&self.url).json(body).send().await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status {
                status: resp.status().as_u16(),
            })
        }
    }
}

/// Alert message for a single drop.
pub fn drop_message(record: &TickRecord) -> Value {
    json!({
        "content": format!(
            "TPS drop detected: {:.2} (average {:.2})",
            record.tick_rate, record.average_tick_rate
        ),
        "embeds": [{
            "title": "TPS Drop",
            "color": DROP_COLOR,
            "timestamp": record.timestamp.to_rfc3339(),
            "fields": [
                { "name": "Sequence", "value": record.sequence_id.to_string(), "inline": true },
                { "name": "TPS", "value": format!("{:.2}", record.tick_rate), "inline": true },
                { "name": "Average", "value": format!("{:.2}", record.average_tick_rate), "inline": true },
            ],
        }],
    })
}

/// Round summary plus the full history under `history`.
pub fn export_message(records: &[TickRecord]) -> Value {
    let (min, max, sum) = records.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), r| (min.min(r.tick_rate), max.max(r.tick_rate), sum + r.tick_rate),
    );
    let mean = if records.is_empty() {
        0.0
    } else {
        sum / records.len() as f64
    };
    let (min, max) = if records.is_empty() { (0.0, 0.0) } else { (min, max) };

    json!({
        "content": format!("Round performance export: {} samples", records.len()),
        "embeds": [{
            "title": "Round TPS summary",
            "color": EXPORT_COLOR,
            "fields": [
                { "name": "Min", "value": format!("{min:.2}"), "inline": true },
                { "name": "Mean", "value": format!("{mean:.2}"), "inline": true },
                { "name": "Max", "value": format!("{max:.2}"), "inline": true },
            ],
        }],
        "history": records,
    })
}

impl Notifier for WebhookNotifier {
    fn notify_drop(
        &self,
        record: TickRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
        Box::pin(async move { self.post(&drop_message(&record)).await })
    }

    fn deliver_export(
        &self,
        records: Vec<TickRecord>,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
        Box::pin(async move {
            let count = records.len();
            self.post(&export_message(&records)).await?;
            info!("Delivered round export with {count} records");
            Ok(())
        })
    }
}
