//! CI pipeline: submit training, locate the artifact, deploy

mod executor;
mod options;
mod report;

pub use executor::{Pipeline, TrackingRun, TrainingSubmission};
pub use options::{
    ModelVariant, PipelineOptions, DEFAULT_SERVING_INSTANCE, DEFAULT_TRAINING_INSTANCE,
    INFERENCE_ENTRY_POINT, TRAIN_ENTRY_POINT,
};
pub use report::StatusReport;
