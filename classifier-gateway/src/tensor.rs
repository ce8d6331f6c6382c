//! Image tensor type and its nested-array JSON encoding.

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Channels per pixel (RGB).
pub const CHANNELS: usize = 3;

/// A batch of normalized images in NHWC layout.
///
/// The rank is not fixed by the type: tensors are produced by a pluggable
/// preprocessor and validated when a request is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: ArrayD<f32>,
}

impl ImageTensor {
    pub fn new(data: ArrayD<f32>) -> Self {
        Self { data }
    }

    /// A `(1, height, width, 3)` tensor filled with `value`.
    pub fn filled(height: usize, width: usize, value: f32) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(&[1, height, width, CHANNELS]), value))
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn view(&self) -> ArrayViewD<'_, f32> {
        self.data.view()
    }

    pub fn into_inner(self) -> ArrayD<f32> {
        self.data
    }
}

impl Serialize for ImageTensor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NestedArray(self.data.view()).serialize(serializer)
    }
}

/// Serializes an n-dimensional view as nested JSON arrays, outermost axis first.
struct NestedArray<'a>(ArrayViewD<'a, f32>);

impl Serialize for NestedArray<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.ndim() == 0 {
            let value = self.0.iter().next().copied().unwrap_or_default();
            return serializer.serialize_f32(value);
        }

        let mut seq = serializer.serialize_seq(Some(self.0.len_of(Axis(0))))?;
        for sub in self.0.outer_iter() {
            seq.serialize_element(&NestedArray(sub))?;
        }
        seq.end()
    }
}
