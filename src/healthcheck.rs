use std::fmt;
use std::time::Duration;

use crate::config::DEFAULT_HTTP_PORT;
use crate::error::AppError;

#[derive(Debug)]
pub struct HealthcheckError(String);

impl fmt::Display for HealthcheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "healthcheck failed: {}", self.0)
    }
}

impl std::error::Error for HealthcheckError {}

/// Probes the local health endpoint of a running instance. Exits
/// non-zero (through the returned error) when the instance is absent
/// or unhealthy.
pub async fn run_healthcheck() -> Result<(), AppError> {
    let port = std::env::var("HTTP_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(DEFAULT_HTTP_PORT);
    healthcheck_with_port(port)
        .await
        .map_err(|e| AppError::Healthcheck(e.to_string()))
}

pub async fn healthcheck_with_port(port: u16) -> Result<(), HealthcheckError> {
    let url = format!("http://127.0.0.1:{port}/v1/health");
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .map_err(|e| HealthcheckError(e.to_string()))?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| HealthcheckError(format!("request to {url} failed: {e}")))?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(HealthcheckError(format!(
            "unexpected status {} from {url}",
            response.status()
        )))
    }
}
