//! Domain layer - pipeline semantics independent of AWS

pub mod deployment;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod resource_name;
pub mod training;

pub use error::DomainError;
pub use resource_name::{validate_resource_name, ResourceName};
