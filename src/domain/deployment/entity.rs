//! Deployment domain entities

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::inference::SerializationContract;
use crate::domain::training::InstanceShape;
use crate::domain::{DomainError, ResourceName};

/// Production variant name SageMaker routes all traffic to
pub const DEFAULT_VARIANT_NAME: &str = "AllTraffic";

/// Model registration: serving image, weights and role
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
    pub name: ResourceName,
    pub image: String,
    pub role: String,
    pub artifact: String,
    pub entry_point: String,
    pub source_bundle: String,
    pub region: String,
    pub environment: BTreeMap<String, String>,
    pub contract: SerializationContract,
}

impl ModelSpec {
    /// Environment for the serving container. The inference toolkit reads
    /// the script location from here and the default accept type must agree
    /// with the contract the façade invokes with.
    pub fn container_environment(&self) -> BTreeMap<String, String> {
        let mut env = self.environment.clone();
        env.insert("SAGEMAKER_PROGRAM".to_string(), self.entry_point.clone());
        env.insert(
            "SAGEMAKER_SUBMIT_DIRECTORY".to_string(),
            self.source_bundle.clone(),
        );
        env.insert("SAGEMAKER_REGION".to_string(), self.region.clone());
        env.insert(
            "SAGEMAKER_DEFAULT_INVOCATIONS_ACCEPT".to_string(),
            self.contract.accept.to_string(),
        );
        env
    }
}

/// Endpoint configuration and the endpoint that serves it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSpec {
    pub name: ResourceName,
    pub config_name: ResourceName,
    pub model_name: ResourceName,
    pub variant_name: String,
    pub instance: InstanceShape,
}

impl EndpointSpec {
    /// Endpoint, endpoint config and model all share one name
    pub fn for_model(model_name: &ResourceName, instance: InstanceShape) -> Self {
        Self {
            name: model_name.clone(),
            config_name: model_name.clone(),
            model_name: model_name.clone(),
            variant_name: DEFAULT_VARIANT_NAME.to_string(),
            instance,
        }
    }
}

/// Endpoint status as reported by the hosting service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointStatus {
    Creating,
    Updating,
    SystemUpdating,
    RollingBack,
    InService,
    Deleting,
    Failed,
    OutOfService,
}

impl EndpointStatus {
    pub fn is_serving(&self) -> bool {
        matches!(self, Self::InService)
    }
}

impl FromStr for EndpointStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Creating" => Ok(Self::Creating),
            "Updating" => Ok(Self::Updating),
            "SystemUpdating" => Ok(Self::SystemUpdating),
            "RollingBack" => Ok(Self::RollingBack),
            "InService" => Ok(Self::InService),
            "Deleting" => Ok(Self::Deleting),
            "Failed" => Ok(Self::Failed),
            "OutOfService" => Ok(Self::OutOfService),
            other => Err(DomainError::validation(format!(
                "Unknown endpoint status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Result of a deployment request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deployment {
    pub model_name: String,
    pub endpoint_name: String,
    pub endpoint_arn: String,
    pub instance_type: String,
    pub artifact: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_environment() {
        let spec = ModelSpec {
            name: ResourceName::new("abc1234").unwrap(),
            image: "pytorch-inference:2.1.0".to_string(),
            role: "arn:aws:iam::123:role/sm".to_string(),
            artifact: "s3://bucket/abc1234/output/model.tar.gz".to_string(),
            entry_point: "src/mnist_sagemaker_ci_cd/lib/inference.py".to_string(),
            source_bundle: "s3://bucket/source/sourcedir.tar.gz".to_string(),
            region: "us-east-1".to_string(),
            environment: BTreeMap::from([("EXTRA".to_string(), "1".to_string())]),
            contract: SerializationContract::NPY_TO_JSON,
        };

        let env = spec.container_environment();

        assert_eq!(env["EXTRA"], "1");
        assert_eq!(
            env["SAGEMAKER_PROGRAM"],
            "src/mnist_sagemaker_ci_cd/lib/inference.py"
        );
        assert_eq!(env["SAGEMAKER_DEFAULT_INVOCATIONS_ACCEPT"], "application/json");
        assert_eq!(env["SAGEMAKER_REGION"], "us-east-1");
    }

    #[test]
    fn test_endpoint_spec_shares_model_name() {
        let name = ResourceName::new("abc1234").unwrap();
        let spec = EndpointSpec::for_model(&name, InstanceShape::new("ml.m5.large", 1).unwrap());

        assert_eq!(spec.name, name);
        assert_eq!(spec.config_name, name);
        assert_eq!(spec.variant_name, "AllTraffic");
    }

    #[test]
    fn test_endpoint_status() {
        assert!(EndpointStatus::InService.is_serving());
        assert!(!EndpointStatus::Creating.is_serving());
        assert_eq!(
            "OutOfService".parse::<EndpointStatus>().unwrap(),
            EndpointStatus::OutOfService
        );
        assert_eq!(EndpointStatus::InService.to_string(), "InService");
        assert!("Bogus".parse::<EndpointStatus>().is_err());
    }
}
