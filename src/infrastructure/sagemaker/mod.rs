//! SageMaker implementations of the training, hosting and inference seams

mod client;
mod in_memory;
mod runtime;

pub use client::SageMakerClient;
pub use in_memory::{InMemorySageMaker, Invocation};
pub use runtime::SageMakerRuntimeClient;

/// Load the shared AWS configuration pinned to `region`
pub async fn load_aws_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await
}
