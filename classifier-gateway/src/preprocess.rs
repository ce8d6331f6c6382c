//! Image preprocessing: raw bytes to a normalized tensor.

use image::imageops::FilterType;
use ndarray::{ArrayD, IxDyn};

use crate::error::{Error, Result};
use crate::tensor::{ImageTensor, CHANNELS};

/// Turns raw image bytes into the tensor the backend expects.
///
/// Implementations must be cheap to share across concurrent requests.
pub trait Preprocessor: Send + Sync {
    fn preprocess(&self, image: &[u8]) -> Result<ImageTensor>;
}

/// Decodes any format supported by the `image` crate, converts to RGB,
/// resizes to a fixed square size and scales pixel values to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    input_size: u32,
    filter: FilterType,
}

impl ImagePreprocessor {
    pub fn new(input_size: u32) -> Self {
        Self {
            input_size,
            filter: FilterType::Triangle,
        }
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }
}

impl Preprocessor for ImagePreprocessor {
    fn preprocess(&self, image: &[u8]) -> Result<ImageTensor> {
        if image.is_empty() {
            return Err(Error::InvalidImage("empty upload".to_string()));
        }

        let decoded =
            image::load_from_memory(image).map_err(|e| Error::InvalidImage(e.to_string()))?;

        let size = self.input_size;
        let rgb = decoded.resize_exact(size, size, self.filter).to_rgb8();

        let side = size as usize;
        let data: Vec<f32> = rgb
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();

        let len = data.len();
        let tensor = ArrayD::from_shape_vec(IxDyn(&[1, side, side, CHANNELS]), data).map_err(
            |_| Error::Shape {
                expected: vec![1, side, side, CHANNELS],
                actual: vec![len],
            },
        )?;

        Ok(ImageTensor::new(tensor))
    }
}
