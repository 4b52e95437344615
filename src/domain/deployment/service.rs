//! Hosting service trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::{EndpointSpec, EndpointStatus, ModelSpec};
use crate::domain::DomainError;

/// Managed model hosting backend
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HostingService: Send + Sync {
    /// Register a model; returns the model ARN
    async fn create_model(&self, spec: &ModelSpec) -> Result<String, DomainError>;

    /// Create the endpoint configuration and the endpoint; returns the endpoint ARN
    async fn create_endpoint(&self, spec: &EndpointSpec) -> Result<String, DomainError>;

    async fn describe_endpoint(&self, name: &str) -> Result<EndpointStatus, DomainError>;
}
