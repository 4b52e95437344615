//! Training service trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::{TrainingJobDescription, TrainingJobSpec};
use crate::domain::DomainError;

/// Managed training backend
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TrainingService: Send + Sync {
    /// Submit a training job; returns the job ARN
    async fn create_training_job(&self, spec: &TrainingJobSpec) -> Result<String, DomainError>;

    /// Describe a training job by name
    async fn describe_training_job(&self, name: &str)
        -> Result<TrainingJobDescription, DomainError>;
}
