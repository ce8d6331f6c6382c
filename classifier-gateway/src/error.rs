//! Error types for the classifier gateway.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

/// Why a single backend attempt failed in a way worth retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientCause {
    /// Backend answered with a retryable HTTP status.
    Status(u16),
    /// The attempt did not complete within its timeout.
    Timeout(Duration),
    /// Connection refused, reset, or otherwise not established.
    Connect(String),
    /// Any other transport-level failure.
    Request(String),
}

impl std::fmt::Display for TransientCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransientCause::Status(status) => write!(f, "backend returned HTTP {}", status),
            TransientCause::Timeout(after) => {
                write!(f, "attempt timed out after {}ms", after.as_millis())
            }
            TransientCause::Connect(msg) => write!(f, "connection failed: {}", msg),
            TransientCause::Request(msg) => write!(f, "request failed: {}", msg),
        }
    }
}

impl From<reqwest::Error> for TransientCause {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransientCause::Connect(err.to_string())
        } else {
            TransientCause::Request(err.to_string())
        }
    }
}

/// Error kinds, without context, for callers that branch on the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Input,
    Shape,
    TransientBackend,
    BackendUnavailable,
    BackendRejected,
    Schema,
    EmptyBatch,
    LabelMismatch,
    DeadlineExceeded,
    InvalidRequest,
    Labels,
    Client,
    PayloadTooLarge,
    Internal,
}

/// Error types for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Tensor shape {actual:?} does not match expected {expected:?}")]
    Shape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Transient backend failure: {0}")]
    TransientBackend(TransientCause),

    #[error("Backend unavailable after {attempts} attempts: {last}")]
    BackendUnavailable { attempts: u32, last: TransientCause },

    #[error("Backend rejected request with HTTP {status}: {body}")]
    BackendRejected { status: u16, body: String },

    #[error("Invalid backend response: {0}")]
    Schema(String),

    #[error("Backend returned an empty prediction batch")]
    EmptyBatch,

    #[error("Backend returned {actual} class probabilities but {expected} labels are loaded")]
    LabelMismatch { expected: usize, actual: usize },

    #[error("Deadline exceeded after {attempts} attempts")]
    DeadlineExceeded { attempts: u32 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Label table error: {0}")]
    Labels(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidImage(_) => ErrorKind::Input,
            Error::Shape { .. } => ErrorKind::Shape,
            Error::TransientBackend(_) => ErrorKind::TransientBackend,
            Error::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
            Error::BackendRejected { .. } => ErrorKind::BackendRejected,
            Error::Schema(_) => ErrorKind::Schema,
            Error::EmptyBatch => ErrorKind::EmptyBatch,
            Error::LabelMismatch { .. } => ErrorKind::LabelMismatch,
            Error::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::Labels(_) => ErrorKind::Labels,
            Error::Client(_) => ErrorKind::Client,
            Error::PayloadTooLarge(_) => ErrorKind::PayloadTooLarge,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientBackend(_))
    }

    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            Error::InvalidImage(_) => (StatusCode::BAD_REQUEST, "invalid_image"),
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Error::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            Error::Shape { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "preprocessing_failed"),
            Error::Labels(_) => (StatusCode::INTERNAL_SERVER_ERROR, "label_table_error"),
            Error::Client(_) | Error::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            Error::TransientBackend(_) => (StatusCode::BAD_GATEWAY, "backend_transient_error"),
            Error::BackendRejected { .. } => (StatusCode::BAD_GATEWAY, "backend_rejected"),
            Error::Schema(_) => (StatusCode::BAD_GATEWAY, "invalid_backend_response"),
            Error::EmptyBatch => (StatusCode::BAD_GATEWAY, "empty_prediction_batch"),
            Error::LabelMismatch { .. } => (StatusCode::BAD_GATEWAY, "label_mismatch"),
            Error::BackendUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "backend_unavailable")
            }
            Error::DeadlineExceeded { .. } => (StatusCode::GATEWAY_TIMEOUT, "deadline_exceeded"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

/// Pipeline stage a prediction failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    BuildRequest,
    Transport,
    Validate,
    Rank,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::BuildRequest => "build_request",
            Stage::Transport => "transport",
            Stage::Validate => "validate",
            Stage::Rank => "rank",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed prediction: the original error plus where and for which request
/// it happened.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed{}: {source}", correlation_suffix(.correlation_id))]
pub struct PredictError {
    pub stage: Stage,
    /// Absent when the failure happened before a request was built.
    pub correlation_id: Option<Uuid>,
    #[source]
    pub source: Error,
}

fn correlation_suffix(id: &Option<Uuid>) -> String {
    id.map(|id| format!(" (request {})", id)).unwrap_or_default()
}

impl PredictError {
    pub fn new(stage: Stage, correlation_id: Option<Uuid>, source: Error) -> Self {
        Self {
            stage,
            correlation_id,
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.source.status_and_type();

        let body = Json(json!({
            "error": {
                "type": error_type,
                "stage": self.stage.as_str(),
                "correlation_id": self.correlation_id.map(|id| id.to_string()),
                "message": self.source.to_string()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
