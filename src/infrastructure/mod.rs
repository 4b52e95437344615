//! Infrastructure layer - AWS-backed implementations

pub mod logging;
pub mod sagemaker;
