//! Endpoint invocation trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::SerializationContract;
use crate::domain::DomainError;

/// Client for a deployed inference endpoint
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Send an encoded request body and return the raw response body
    async fn invoke(
        &self,
        endpoint_name: &str,
        contract: SerializationContract,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, DomainError>;
}
