//! Backend response validation.

use classifier_common::PredictResponseBody;

use crate::error::{Error, Result};

/// Class probabilities for one image, in label-table order.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResponse {
    probabilities: Vec<f64>,
}

impl PredictionResponse {
    pub fn new(probabilities: Vec<f64>) -> Self {
        Self { probabilities }
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}

/// Checks a raw predict body against the expected schema and label count.
///
/// Any structural mismatch is fatal; nothing is patched up or truncated.
#[derive(Debug, Clone, Copy)]
pub struct ResponseValidator {
    num_labels: usize,
}

impl ResponseValidator {
    pub fn new(num_labels: usize) -> Self {
        Self { num_labels }
    }

    pub fn validate(&self, body: &[u8]) -> Result<PredictionResponse> {
        let parsed: PredictResponseBody = serde_json::from_slice(body)
            .map_err(|e| Error::Schema(format!("malformed predict response: {}", e)))?;

        let predictions = match parsed.predictions {
            Some(predictions) => predictions,
            None => {
                let detail = parsed
                    .error
                    .map(|e| format!(" (backend error: {})", e))
                    .unwrap_or_default();
                return Err(Error::Schema(format!(
                    "response has no `predictions` field{}",
                    detail
                )));
            }
        };

        let mut batch = predictions.into_iter();
        let probabilities = batch.next().ok_or(Error::EmptyBatch)?;
        let extra = batch.count();
        if extra > 0 {
            return Err(Error::Schema(format!(
                "expected 1 prediction for a single image, got {}",
                extra + 1
            )));
        }

        if probabilities.len() != self.num_labels {
            return Err(Error::LabelMismatch {
                expected: self.num_labels,
                actual: probabilities.len(),
            });
        }

        Ok(PredictionResponse::new(probabilities))
    }
}
