//! Image classifier gateway.
//!
//! Fronts a TensorFlow-Serving style model backend: turns uploaded images into
//! input tensors, calls the backend with bounded retries, validates the answer
//! and ranks class probabilities.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod labels;
pub mod logging;
pub mod preprocess;
pub mod rank;
pub mod request;
pub mod state;
pub mod tensor;
pub mod transport;
pub mod validate;

pub use config::Config;
pub use error::{Error, ErrorKind, PredictError, Stage, TransientCause};
pub use gateway::Gateway;
pub use health::HealthProbe;
pub use labels::LabelTable;
pub use preprocess::{ImagePreprocessor, Preprocessor};
pub use rank::TopKRanker;
pub use request::{PredictionRequest, RequestBuilder};
pub use state::AppState;
pub use tensor::ImageTensor;
pub use transport::{RetryPolicy, RetryingTransport, Transport};
pub use validate::{PredictionResponse, ResponseValidator};
