//! Backend transport abstraction.
//!
//! The gateway talks to the model backend through the `Transport` trait so the
//! HTTP client can be swapped or faked. `RetryingTransport` is the production
//! implementation.

mod http;
mod policy;

pub use http::{RetryingTransport, REQUEST_ID_HEADER};
pub use policy::{RetryPolicy, DEFAULT_RETRYABLE_STATUSES};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;

use crate::error::Result;
use crate::request::PredictionRequest;

/// Delivers a prediction request to the backend and returns the raw body of
/// a successful response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `deadline` bounds the whole call, retries included.
    async fn send(&self, request: &PredictionRequest, deadline: Option<Instant>) -> Result<Bytes>;
}
