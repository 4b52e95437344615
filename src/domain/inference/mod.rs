//! Inference domain - payload shaping and endpoint invocation

mod client;
mod contract;
pub mod npy;
mod predictor;
mod sample;
mod transform;

#[cfg(test)]
pub use client::MockInferenceClient;
pub use client::InferenceClient;
pub use contract::{PayloadMode, SerializationContract, CONTENT_TYPE_JSON, CONTENT_TYPE_NPY};
pub use predictor::{extract_prediction, Predictor, PREDICTION_FIELD};
pub use sample::{demo_grid, DEMO_DOCUMENT};
pub use transform::{Grid, ImageTransform, MNIST_HEIGHT, MNIST_WIDTH};
