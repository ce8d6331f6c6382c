//! Backend health probing.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use classifier_common::{HealthStatus, ModelStatusResponse};
use reqwest::{Client, StatusCode};

/// Queries the backend model status endpoint.
///
/// Each probe is a single request on its own short timeout. There are no
/// retries; callers decide how often to probe. The last observed status is
/// kept so it can be reported without another round trip.
pub struct HealthProbe {
    http_client: Client,
    status_url: String,
    timeout: Duration,
    last: RwLock<HealthStatus>,
}

impl HealthProbe {
    pub fn new(http_client: Client, status_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client,
            status_url: status_url.into(),
            timeout,
            last: RwLock::new(HealthStatus::Unknown),
        }
    }

    pub fn status_url(&self) -> &str {
        &self.status_url
    }

    /// Status seen by the most recent probe, `Unknown` before the first one.
    pub fn last_known(&self) -> HealthStatus {
        self.last
            .read()
            .map(|status| *status)
            .unwrap_or(HealthStatus::Unknown)
    }

    /// Probe the backend once and record the result.
    pub async fn probe(&self) -> HealthStatus {
        let started = Instant::now();
        let status = self.query().await;

        let previous = match self.last.write() {
            Ok(mut last) => std::mem::replace(&mut *last, status),
            Err(_) => HealthStatus::Unknown,
        };

        if previous != status {
            tracing::info!(
                url = %self.status_url,
                from = %previous,
                to = %status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Backend health changed"
            );
        }

        status
    }

    async fn query(&self) -> HealthStatus {
        let response = match self
            .http_client
            .get(&self.status_url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Health probe to {} failed: {}", self.status_url, e);
                return HealthStatus::Unavailable;
            }
        };

        if response.status() != StatusCode::OK {
            tracing::debug!(
                "Health probe to {} returned {}",
                self.status_url,
                response.status()
            );
            return HealthStatus::Unavailable;
        }

        // The probe timeout also covers reading the body.
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Health probe to {} failed reading body: {}", self.status_url, e);
                return HealthStatus::Unavailable;
            }
        };

        // A 200 means available unless the body is a model status document
        // that lists no servable version.
        match serde_json::from_slice::<ModelStatusResponse>(&body) {
            Ok(status) if !status.model_version_status.is_empty() && !status.any_available() => {
                tracing::debug!("Model at {} has no AVAILABLE version", self.status_url);
                HealthStatus::Unavailable
            }
            _ => HealthStatus::Healthy,
        }
    }
}
