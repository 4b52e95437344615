//! SageMaker runtime client for invoking deployed endpoints

use async_trait::async_trait;
use aws_sdk_sagemakerruntime::error::DisplayErrorContext;
use aws_sdk_sagemakerruntime::primitives::Blob;

use crate::domain::inference::{InferenceClient, SerializationContract};
use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct SageMakerRuntimeClient {
    client: aws_sdk_sagemakerruntime::Client,
}

impl SageMakerRuntimeClient {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_sagemakerruntime::Client::new(config),
        }
    }
}

#[async_trait]
impl InferenceClient for SageMakerRuntimeClient {
    async fn invoke(
        &self,
        endpoint_name: &str,
        contract: SerializationContract,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, DomainError> {
        let response = self
            .client
            .invoke_endpoint()
            .endpoint_name(endpoint_name)
            .content_type(contract.content_type)
            .accept(contract.accept)
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| {
                DomainError::provider(
                    "endpoint",
                    format!("InvokeEndpoint failed: {}", DisplayErrorContext(e)),
                )
            })?;

        Ok(response
            .body()
            .map(|b| b.as_ref().to_vec())
            .unwrap_or_default())
    }
}
