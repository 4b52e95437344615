//! Deployment domain - model registration and endpoints

mod entity;
mod service;

pub use entity::{Deployment, EndpointSpec, EndpointStatus, ModelSpec, DEFAULT_VARIANT_NAME};
#[cfg(test)]
pub use service::MockHostingService;
pub use service::HostingService;
