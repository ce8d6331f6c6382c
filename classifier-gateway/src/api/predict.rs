//! Image prediction endpoint.

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use classifier_common::PredictResponse;
use serde::Deserialize;

use crate::error::{Error, PredictError, Stage};
use crate::state::AppState;

/// Multipart field holding the image.
const FILE_FIELD: &str = "file";

/// Build the predict router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/predict-image", post(predict_image))
        .route("/predict-image/", post(predict_image))
}

#[derive(Debug, Deserialize)]
pub struct PredictParams {
    /// Number of classes to return; defaults to `model.default_top_k`.
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// POST /predict-image - classify an uploaded image.
async fn predict_image(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PredictParams>,
    multipart: Multipart,
) -> Result<Json<PredictResponse>, PredictError> {
    let k = params.top_k.unwrap_or(state.config.model.default_top_k);
    let image = read_image(multipart).await?;

    tracing::debug!("Predict request: {} bytes, top_k={}", image.len(), k);

    let result = state.gateway.predict(&image, k).await?;
    Ok(Json(PredictResponse::from_ranking(&result, k)))
}

/// Take the `file` field, or the first unnamed field, from the upload.
async fn read_image(mut multipart: Multipart) -> Result<bytes::Bytes, PredictError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error("malformed multipart body", e))?
    {
        if field.name().map_or(true, |name| name == FILE_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| upload_error("failed to read upload", e));
        }
    }

    Err(PredictError::new(
        Stage::Preprocess,
        None,
        Error::InvalidImage(format!("missing `{}` field", FILE_FIELD)),
    ))
}

/// Uploads over the body limit are reported as such, anything else as a bad image.
fn upload_error(context: &str, err: MultipartError) -> PredictError {
    let source = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(err.body_text())
    } else {
        Error::InvalidImage(format!("{}: {}", context, err))
    };
    PredictError::new(Stage::Preprocess, None, source)
}
