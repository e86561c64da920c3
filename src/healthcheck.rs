use std::time::Duration;
use thiserror::Error;

/// Route served by the health handler.
pub const HEALTH_PATH: &str = "/v1/health";

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum HealthcheckError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Health request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Health endpoint returned status: {0}")]
    Status(u16),
}

/// Probe the local health endpoint on `port`.
pub async fn healthcheck_with_port(port: u16) -> Result<(), HealthcheckError> {
    let client = reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(HealthcheckError::Client)?;

    let resp = client
        .get(format!("http://127.0.0.1:{port}{HEALTH_PATH}"))
        .send()
        .await?;

    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(HealthcheckError::Status(status.as_u16()))
    }
}
