//! HTTP transport with per-attempt timeouts and bounded retries.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::time::Instant;

use super::{RetryPolicy, Transport};
use crate::config::BackendConfig;
use crate::error::{Error, Result, TransientCause};
use crate::request::PredictionRequest;

/// Header carrying the correlation id to the backend.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Sends predict requests to the backend, retrying transient failures.
///
/// Holds a single pooled `reqwest::Client`; one instance is meant to be
/// shared by all concurrent predict calls.
pub struct RetryingTransport {
    http_client: Client,
    predict_url: String,
    attempt_timeout: Duration,
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(
        http_client: Client,
        predict_url: impl Into<String>,
        attempt_timeout: Duration,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            http_client,
            predict_url: predict_url.into(),
            attempt_timeout,
            policy,
        }
    }

    /// Build a transport and its connection pool from configuration.
    pub fn from_config(backend: &BackendConfig, policy: RetryPolicy) -> Result<Self> {
        let http_client = Client::builder()
            .pool_max_idle_per_host(backend.pool_max_idle_per_host)
            .connect_timeout(backend.request_timeout())
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;

        Ok(Self::new(
            http_client,
            backend.predict_url(),
            backend.request_timeout(),
            policy,
        ))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }

    /// One HTTP round trip, classified into success, transient or terminal.
    async fn attempt(&self, request: &PredictionRequest, timeout: Duration) -> Result<Bytes> {
        let response = self
            .http_client
            .post(&self.predict_url)
            .header(CONTENT_TYPE, "application/json")
            .header(REQUEST_ID_HEADER, request.correlation_id.to_string())
            .timeout(timeout)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if status.is_success() {
            return response
                .bytes()
                .await
                .map_err(|e| classify(e, timeout));
        }

        if self.policy.is_retryable_status(status.as_u16()) {
            return Err(Error::TransientBackend(TransientCause::Status(
                status.as_u16(),
            )));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        Err(Error::BackendRejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Map a reqwest failure to a transient cause, or to a terminal client error
/// when retrying cannot help (bad URL, redirect loop, undecodable body).
fn classify(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_builder() || err.is_redirect() || err.is_decode() {
        return Error::Client(err.to_string());
    }
    if err.is_timeout() {
        return Error::TransientBackend(TransientCause::Timeout(timeout));
    }
    Error::TransientBackend(TransientCause::from(err))
}

#[async_trait]
impl Transport for RetryingTransport {
    async fn send(&self, request: &PredictionRequest, deadline: Option<Instant>) -> Result<Bytes> {
        let correlation_id = request.correlation_id;
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            // Never start an attempt past the caller's deadline, and never let
            // one run beyond it.
            let mut timeout = self.attempt_timeout;
            let mut clamped = false;
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    tracing::warn!(
                        correlation_id = %correlation_id,
                        attempt,
                        "Deadline passed before predict attempt could start"
                    );
                    return Err(Error::DeadlineExceeded {
                        attempts: attempt - 1,
                    });
                }
                if remaining < timeout {
                    timeout = remaining;
                    clamped = true;
                }
            }

            let started = Instant::now();
            let result = self.attempt(request, timeout).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let cause = match result {
                Ok(body) => {
                    tracing::info!(
                        correlation_id = %correlation_id,
                        attempt,
                        elapsed_ms,
                        "Predict attempt succeeded"
                    );
                    return Ok(body);
                }
                Err(Error::TransientBackend(cause)) => cause,
                Err(e) => {
                    tracing::warn!(
                        correlation_id = %correlation_id,
                        attempt,
                        elapsed_ms,
                        error = %e,
                        "Predict attempt failed, not retrying"
                    );
                    return Err(e);
                }
            };

            tracing::warn!(
                correlation_id = %correlation_id,
                attempt,
                max_attempts,
                elapsed_ms,
                cause = %cause,
                "Predict attempt failed"
            );

            if clamped && matches!(cause, TransientCause::Timeout(_)) {
                return Err(Error::DeadlineExceeded { attempts: attempt });
            }

            if attempt >= max_attempts {
                return Err(Error::BackendUnavailable {
                    attempts: attempt,
                    last: cause,
                });
            }

            let delay = self.policy.backoff(attempt);
            if let Some(deadline) = deadline {
                if Instant::now() + delay >= deadline {
                    tracing::warn!(
                        correlation_id = %correlation_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Backoff would cross the deadline, giving up"
                    );
                    return Err(Error::DeadlineExceeded { attempts: attempt });
                }
            }

            tracing::debug!(
                correlation_id = %correlation_id,
                delay_ms = delay.as_millis() as u64,
                "Backing off before next predict attempt"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
