//! Wire types for the model-serving backend (TensorFlow Serving REST API).
//!
//! # Endpoints
//!
//! - `POST /v1/models/{model}:predict` with `{"instances": [...]}`, answered
//!   by `{"predictions": [[p0, p1, ...]]}`
//! - `GET /v1/models/{model}`, answered by a model status document
//!
//! The request body is produced by the gateway directly from its tensor type,
//! so only the response side is modelled here.

use serde::{Deserialize, Serialize};

/// Body of a predict response.
///
/// Every field is optional so that a structurally wrong body can be reported
/// precisely instead of failing with a generic decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictResponseBody {
    #[serde(default)]
    pub predictions: Option<Vec<Vec<f64>>>,
    /// Present when the backend reports a failure with a 200 status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Model state as reported by the status endpoint.
pub const MODEL_STATE_AVAILABLE: &str = "AVAILABLE";

/// Body of `GET /v1/models/{model}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelStatusResponse {
    #[serde(default)]
    pub model_version_status: Vec<ModelVersionStatus>,
}

impl ModelStatusResponse {
    /// True if at least one version of the model is servable.
    pub fn any_available(&self) -> bool {
        self.model_version_status
            .iter()
            .any(|v| v.state == MODEL_STATE_AVAILABLE)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelVersionStatus {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub status: Option<StatusDetail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusDetail {
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub error_message: String,
}
