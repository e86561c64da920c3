//! NDJSON input feed: tick samples, raw log lines and discrete events.
//!
//! Each line is one message tagged by `type`:
//!
//! ```text
//! {"type":"tick","tickRate":49.8,"context":{"players":98,"layer":"Narva_AAS_v1"}}
//! {"type":"event","name":"PLAYER_CONNECTED","payload":{"eosId":"0002..."}}
//! {"type":"log","line":"[2024.03.09-18.22.31:513][412]LogCsvProfiler: ..."}
//! ```
//!
//! Anything that is not a feed message is treated as a raw log line.

use crate::domain::{EventRecord, TickSample};
use crate::monitor::TickMonitor;
use crate::notify::Notification;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Tick {
        #[serde(rename = "tickRate", alias = "tps")]
        tick_rate: f64,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
        #[serde(default)]
        context: Value,
    },
    Log {
        line: String,
    },
    Event {
        name: String,
        #[serde(default)]
        payload: Value,
    },
}

impl FeedMessage {
    /// Parse one input line. Never fails: unknown input becomes a raw log line.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.starts_with('{')
            && let Ok(message) = serde_json::from_str::<FeedMessage>(trimmed)
        {
            return message;
        }

        FeedMessage::Log {
            line: line.trim_end_matches(['\r', '\n']).to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub ticks: u64,
    pub log_lines: u64,
    pub events: u64,
    pub drops: u64,
    pub exports: u64,
}

/// Drives a [`TickMonitor`] from feed messages and hands exports to the notifier.
pub struct FeedDriver {
    monitor: TickMonitor,
    notifications: mpsc::UnboundedSender<Notification>,
    export_requested: Arc<AtomicBool>,
    stats: FeedStats,
}

impl FeedDriver {
    /// `round_end_event` names the event that triggers a history export and reset.
    pub fn new(
        mut monitor: TickMonitor,
        notifications: mpsc::UnboundedSender<Notification>,
        round_end_event: &str,
    ) -> Self {
        let export_requested = Arc::new(AtomicBool::new(false));
        let flag = export_requested.clone();
        monitor.router_mut().subscribe(round_end_event, move |_| {
            flag.store(true, Ordering::SeqCst);
        });

        Self {
            monitor,
            notifications,
            export_requested,
            stats: FeedStats::default(),
        }
    }

    pub fn monitor(&self) -> &TickMonitor {
        &self.monitor
    }

    pub fn stats(&self) -> FeedStats {
        self.stats
    }

    pub fn handle_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.handle(FeedMessage::parse(line));
    }

    pub fn handle(&mut self, message: FeedMessage) {
        match message {
            FeedMessage::Tick {
                tick_rate,
                timestamp,
                context,
            } => {
                let sample = TickSample::new(tick_rate, timestamp.unwrap_or_else(Utc::now))
                    .with_context(context);
                let outcome = self.monitor.ingest(sample);
                debug!(
                    sequence_id = outcome.sequence_id,
                    tick_rate = outcome.tick_rate,
                    average_tick_rate = outcome.average_tick_rate,
                    "Ingested tick sample"
                );
                self.stats.ticks += 1;
                if outcome.dropped {
                    self.stats.drops += 1;
                }
            }
            FeedMessage::Log { line } => {
                self.monitor.handle_log_line(&line);
                self.stats.log_lines += 1;
            }
            FeedMessage::Event { name, payload } => {
                self.monitor.dispatch_event(EventRecord::new(name, payload));
                self.stats.events += 1;
            }
        }

        if self.export_requested.swap(false, Ordering::SeqCst) {
            self.export_round();
        }
    }

    /// Hand the current history to the notifier and reset it.
    pub fn export_round(&mut self) {
        let records = self.monitor.drain();
        info!(records = records.len(), "Round ended, exporting history");
        self.stats.exports += 1;
        if self.notifications.send(Notification::Export(records)).is_err() {
            warn!("Notification dispatcher stopped, round export discarded");
        }
    }

    /// Read feed lines until EOF or shutdown.
    ///
    /// Bytes that are not valid UTF-8 are replaced, so a garbled line is still
    /// archived as a log line instead of ending the feed.
    pub async fn run<R>(&mut self, mut reader: R, shutdown: CancellationToken) -> std::io::Result<FeedStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Feed stopped by shutdown signal");
                    break;
                }
                read = reader.read_until(b'\n', &mut buf) => {
                    if read? == 0 {
                        info!("Feed reached end of input");
                        break;
                    }
                    let line = String::from_utf8_lossy(&buf);
                    self.handle_line(line.trim_end_matches(['\r', '\n']));
                }
            }
        }

        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::MonitorConfig;
    use serde_json::json;

    fn driver() -> (FeedDriver, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = TickMonitor::new(MonitorConfig {
            capacity: 10,
            ..MonitorConfig::default()
        })
        .unwrap();
        (FeedDriver::new(monitor, tx, "NEW_GAME"), rx)
    }

    #[test]
    fn test_parse_tick_message() {
        let message = FeedMessage::parse(
            r#"{"type":"tick","tickRate":49.5,"timestamp":"2024-03-09T18:22:31Z","context":{"players":80}}"#,
        );

        match message {
            FeedMessage::Tick {
                tick_rate,
                timestamp,
                context,
            } => {
                assert_eq!(tick_rate, 49.5);
                assert!(timestamp.is_some());
                assert_eq!(context, json!({"players": 80}));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_tps_alias_and_defaults() {
        assert_eq!(
            FeedMessage::parse(r#"{"type":"tick","tps":30}"#),
            FeedMessage::Tick {
                tick_rate: 30.0,
                timestamp: None,
                context: Value::Null,
            }
        );
    }

    #[test]
    fn test_parse_event_message() {
        assert_eq!(
            FeedMessage::parse(r#"{"type":"event","name":"NEW_GAME"}"#),
            FeedMessage::Event {
                name: "NEW_GAME".into(),
                payload: Value::Null,
            }
        );
    }

    #[test]
    fn test_non_feed_input_becomes_log_line() {
        let raw = "[2024.03.09-18.22.31:513][412]LogSquad: Player connected";
        assert_eq!(
            FeedMessage::parse(raw),
            FeedMessage::Log {
                line: raw.to_string()
            }
        );
        // JSON that is not a feed message is also kept verbatim
        assert!(matches!(
            FeedMessage::parse(r#"{"level":"info"}"#),
            FeedMessage::Log { .. }
        ));
    }

    #[test]
    fn test_round_end_exports_and_resets() {
        let (mut driver, mut rx) = driver();
        driver.handle_line(r#"{"type":"tick","tickRate":50}"#);
        driver.handle_line(r#"{"type":"tick","tickRate":49}"#);
        driver.handle_line(r#"{"type":"event","name":"NEW_GAME","payload":{"layer":"Gorodok_RAAS_v1"}}"#);

        assert!(driver.monitor().is_empty());
        assert_eq!(driver.stats().exports, 1);

        match rx.try_recv().unwrap() {
            Notification::Export(records) => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[1].events[0].name, "NEW_GAME");
            }
            other => panic!("unexpected notification: {other:?}"),
        }
    }

    #[test]
    fn test_other_events_do_not_export() {
        let (mut driver, mut rx) = driver();
        driver.handle_line(r#"{"type":"tick","tickRate":50}"#);
        driver.handle_line(r#"{"type":"event","name":"PLAYER_CONNECTED"}"#);

        assert_eq!(driver.monitor().len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_reads_until_eof() {
        let (mut driver, _rx) = driver();
        let input = concat!(
            "{\"type\":\"tick\",\"tickRate\":50}\n",
            "\n",
            "some raw log line\n",
            "{\"type\":\"tick\",\"tickRate\":10}\n",
        );

        let stats = driver
            .run(input.as_bytes(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.log_lines, 1);
        assert_eq!(stats.drops, 1);
    }

    #[tokio::test]
    async fn test_run_keeps_going_past_invalid_utf8() {
        let (mut driver, _rx) = driver();
        let mut input = b"{\"type\":\"tick\",\"tickRate\":50}\n".to_vec();
        input.extend_from_slice(b"LogSquad: Player joined \xff\xfe name\n");
        input.extend_from_slice(b"{\"type\":\"tick\",\"tickRate\":49}");

        let stats = driver
            .run(input.as_slice(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.log_lines, 1);

        let history = driver.monitor().exporter().export();
        assert_eq!(history[0].logs.count, 1);
        assert_eq!(
            history[0].logs.history,
            vec!["LogSquad: Player joined \u{FFFD}\u{FFFD} name".to_string()]
        );
        assert_eq!(history[1].tick_rate, 49.0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (mut driver, _rx) = driver();
        let token = CancellationToken::new();
        token.cancel();

        let (_writer, reader) = tokio::io::duplex(64);
        let stats = driver
            .run(tokio::io::BufReader::new(reader), token)
            .await
            .unwrap();
        assert_eq!(stats, FeedStats::default());
    }
}
