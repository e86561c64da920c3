use crate::error::TickwatchError;
use crate::healthcheck::HEALTH_PATH;
use crate::monitor::MonitorConfig;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Probe the local health endpoint and exit 0 on success
    Healthcheck,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Maximum number of tick records kept in memory
    #[arg(long, env = "HISTORY_CAPACITY", default_value = "600")]
    pub history_capacity: usize,

    /// Number of trailing samples in the rolling average
    #[arg(long, env = "AVERAGE_WINDOW", default_value = "10")]
    pub average_window: usize,

    /// A sample below previous * threshold is reported as a drop
    #[arg(long, env = "DROP_THRESHOLD", default_value = "0.75")]
    pub drop_threshold: f64,

    /// HTTP port for the history endpoint
    #[arg(long, env = "HTTP_PORT", default_value = "9600")]
    pub http_port: u16,

    /// Path serving the history as JSON
    #[arg(long, env = "HTTP_PATH", default_value = "/tps")]
    pub http_path: String,

    /// Discord-style webhook for drop alerts and round exports
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Event name that ends a round and triggers export + reset
    #[arg(long, env = "ROUND_END_EVENT", default_value = "NEW_GAME")]
    pub round_end_event: String,

    /// Probability of artificially dropping a sample (testing only)
    #[arg(long, env = "SIMULATE_DROP_PROBABILITY", default_value = "0.0")]
    pub simulate_drop_probability: f64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

impl Settings {
    /// Validates the settings and returns an error if invalid.
    pub fn validate(&self) -> Result<(), TickwatchError> {
        validate_positive("History capacity", self.history_capacity)?;
        validate_positive("Average window", self.average_window)?;
        validate_ratio("Drop threshold", self.drop_threshold, false)?;
        validate_ratio(
            "Simulated drop probability",
            self.simulate_drop_probability,
            true,
        )?;
        validate_port(self.http_port)?;
        validate_path(&self.http_path)?;
        if let Some(url) = &self.webhook_url {
            validate_url(url)?;
        }
        if self.round_end_event.trim().is_empty() {
            return Err(TickwatchError::Config(
                "Round end event cannot be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            capacity: self.history_capacity,
            average_window: self.average_window,
            drop_threshold: self.drop_threshold,
        }
    }
}

fn validate_positive(name: &str, value: usize) -> Result<(), TickwatchError> {
    if value == 0 {
        return Err(TickwatchError::Config(format!("{name} must be at least 1")));
    }
    Ok(())
}

/// Threshold must lie in (0, 1]; probability in [0, 1].
fn validate_ratio(name: &str, value: f64, allow_zero: bool) -> Result<(), TickwatchError> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if !value.is_finite() || !lower_ok || value > 1.0 {
        return Err(TickwatchError::Config(format!(
            "{name} out of range: {value}"
        )));
    }
    Ok(())
}

fn validate_port(port: u16) -> Result<(), TickwatchError> {
    if port == 0 {
        return Err(TickwatchError::Config("Port cannot be 0".into()));
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<(), TickwatchError> {
    if !path.starts_with('/') || path.contains(char::is_whitespace) {
        return Err(TickwatchError::Config(format!(
            "HTTP path must start with '/' and contain no whitespace: {path}"
        )));
    }
    if path == HEALTH_PATH {
        return Err(TickwatchError::Config(format!(
            "HTTP path {path} is reserved for the health check"
        )));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<(), TickwatchError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(TickwatchError::Config(format!("Invalid webhook URL: {url}")));
    }
    Ok(())
}

/// Parse CLI arguments and environment. `--help` and parse errors exit the process.
pub fn get_configuration() -> Result<Settings, TickwatchError> {
    let settings = Settings::parse();
    settings.validate()?;
    Ok(settings)
}
