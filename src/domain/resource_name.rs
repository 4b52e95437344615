//! Validated SageMaker resource names

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::DomainError;

/// Maximum length SageMaker accepts for job, model and endpoint names
pub const MAX_RESOURCE_NAME_LENGTH: usize = 63;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9](-*[a-zA-Z0-9])*$").unwrap());

/// Name shared by a training job, model, endpoint config and endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        validate_resource_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn validate_resource_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() {
        return Err(DomainError::validation("Resource name cannot be empty"));
    }

    if name.len() > MAX_RESOURCE_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Resource name too long: {} characters (max {})",
            name.len(),
            MAX_RESOURCE_NAME_LENGTH
        )));
    }

    if !NAME_PATTERN.is_match(name) {
        return Err(DomainError::validation(format!(
            "Invalid resource name '{}': must be alphanumeric with hyphens, cannot start or end with hyphen",
            name
        )));
    }

    Ok(())
}

impl TryFrom<String> for ResourceName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceName> for String {
    fn from(name: ResourceName) -> Self {
        name.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
