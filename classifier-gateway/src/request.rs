//! Prediction request construction.

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::tensor::{ImageTensor, CHANNELS};

/// A serialized predict call, ready to be sent (and re-sent) to the backend.
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    /// Identifies one logical predict call across all of its attempts.
    pub correlation_id: Uuid,
    /// JSON body `{"instances": [...]}`.
    pub body: Bytes,
}

#[derive(Serialize)]
struct PredictPayload<'a> {
    instances: &'a ImageTensor,
}

/// Validates tensors against the configured input size and wraps them into
/// backend payloads.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder {
    height: usize,
    width: usize,
}

impl RequestBuilder {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn square(size: u32) -> Self {
        Self::new(size as usize, size as usize)
    }

    pub fn expected_shape(&self) -> [usize; 4] {
        [1, self.height, self.width, CHANNELS]
    }

    /// Check the tensor shape, serialize it and assign a fresh correlation id.
    pub fn build(&self, tensor: &ImageTensor) -> Result<PredictionRequest> {
        let expected = self.expected_shape();
        if tensor.shape() != &expected[..] {
            return Err(Error::Shape {
                expected: expected.to_vec(),
                actual: tensor.shape().to_vec(),
            });
        }

        let body = serde_json::to_vec(&PredictPayload { instances: tensor })
            .map_err(|e| Error::InvalidRequest(format!("failed to encode tensor: {}", e)))?;

        Ok(PredictionRequest {
            correlation_id: Uuid::new_v4(),
            body: Bytes::from(body),
        })
    }
}
