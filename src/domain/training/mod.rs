//! Training domain - job specifications and the training backend seam

mod entity;
mod service;

pub use entity::{
    parse_hyperparameter, DataSource, HyperparameterValue, InstanceShape,
    TrainingJobDescription, TrainingJobSpec, TrainingJobStatus, DEFAULT_MAX_RUNTIME_SECS,
    DEFAULT_VOLUME_SIZE_GB, TRAINING_CHANNEL,
};
#[cfg(test)]
pub use service::MockTrainingService;
pub use service::TrainingService;
