//! Image Classifier Common Types
//!
//! Shared types used by the classifier gateway and its clients.

pub mod prediction;
pub mod protocol;

pub use prediction::{
    ClassConfidence, HealthResponse, HealthStatus, PredictResponse, RankedClass, TopKResult,
};
pub use protocol::{ModelStatusResponse, ModelVersionStatus, PredictResponseBody, StatusDetail};
