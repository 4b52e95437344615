//! Training job domain entities

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, ResourceName};

/// Default stopping condition: 24 hours
pub const DEFAULT_MAX_RUNTIME_SECS: i32 = 86_400;

/// Default EBS volume attached to each training instance
pub const DEFAULT_VOLUME_SIZE_GB: i32 = 30;

/// Channel name used for S3 training inputs
pub const TRAINING_CHANNEL: &str = "training";

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HyperparameterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl HyperparameterValue {
    /// JSON-encode the value; the training toolkit decodes every
    /// hyperparameter with `json.loads`
    pub fn to_wire(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::Integer(v) => v.to_string(),
            Self::Float(v) => serde_json::Value::from(*v).to_string(),
            Self::String(v) => serde_json::Value::from(v.as_str()).to_string(),
        }
    }
}

impl From<&str> for HyperparameterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for HyperparameterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for HyperparameterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for HyperparameterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for HyperparameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Parse `key=value` pairs given on the command line. Integers, floats and
/// booleans are detected; anything else is kept as a string.
pub fn parse_hyperparameter(raw: &str) -> Result<(String, HyperparameterValue), DomainError> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        DomainError::validation(format!("Hyperparameter '{}' must be key=value", raw))
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(DomainError::validation("Hyperparameter key cannot be empty"));
    }

    let value = value.trim();
    let parsed = if let Ok(v) = value.parse::<i64>() {
        HyperparameterValue::Integer(v)
    } else if let Ok(v) = value.parse::<f64>() {
        // JSON has no encoding for NaN or infinity
        if !v.is_finite() {
            return Err(DomainError::validation(format!(
                "Hyperparameter '{}' must be a finite number, got '{}'",
                key, value
            )));
        }
        HyperparameterValue::Float(v)
    } else if let Ok(v) = value.parse::<bool>() {
        HyperparameterValue::Bool(v)
    } else {
        HyperparameterValue::String(value.to_string())
    };

    Ok((key.to_string(), parsed))
}

/// Instance type and count for a training job or endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceShape {
    pub instance_type: String,
    pub instance_count: u32,
}

impl InstanceShape {
    pub fn new(instance_type: impl Into<String>, instance_count: u32) -> Result<Self, DomainError> {
        let instance_type = instance_type.into();

        if !instance_type.starts_with("ml.") {
            return Err(DomainError::validation(format!(
                "Instance type '{}' must start with 'ml.'",
                instance_type
            )));
        }

        if instance_count == 0 {
            return Err(DomainError::validation("Instance count must be at least 1"));
        }

        Ok(Self {
            instance_type,
            instance_count,
        })
    }
}

/// Where the training container gets its data from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    /// The container pulls the dataset itself with DVC; no input channel
    #[default]
    Dvc,
    /// An S3 prefix mounted as the `training` channel
    S3 { uri: String },
}

impl FromStr for DataSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dvc" => Ok(Self::Dvc),
            uri => {
                crate::config::settings::validate_s3_uri("data source", uri)?;
                Ok(Self::S3 {
                    uri: uri.to_string(),
                })
            }
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dvc => write!(f, "dvc"),
            Self::S3 { uri } => write!(f, "{}", uri),
        }
    }
}

/// Everything needed to submit one training job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingJobSpec {
    pub name: ResourceName,
    pub image: String,
    pub role: String,
    pub entry_point: String,
    pub source_bundle: String,
    pub region: String,
    pub instance: InstanceShape,
    pub hyperparameters: BTreeMap<String, HyperparameterValue>,
    pub environment: BTreeMap<String, String>,
    pub data_source: DataSource,
    pub output_path: String,
    pub max_runtime_secs: i32,
}

impl TrainingJobSpec {
    /// Hyperparameters as sent on the wire, including the script-mode keys
    /// the training toolkit uses to locate and run the entry point
    pub fn wire_hyperparameters(&self) -> BTreeMap<String, String> {
        let mut wire: BTreeMap<String, String> = self
            .hyperparameters
            .iter()
            .map(|(k, v)| (k.clone(), v.to_wire()))
            .collect();

        wire.insert(
            "sagemaker_program".to_string(),
            HyperparameterValue::from(self.entry_point.as_str()).to_wire(),
        );
        wire.insert(
            "sagemaker_submit_directory".to_string(),
            HyperparameterValue::from(self.source_bundle.as_str()).to_wire(),
        );
        wire.insert(
            "sagemaker_region".to_string(),
            HyperparameterValue::from(self.region.as_str()).to_wire(),
        );
        wire.insert(
            "sagemaker_container_log_level".to_string(),
            HyperparameterValue::Integer(20).to_wire(),
        );

        wire
    }
}

/// Training job status as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingJobStatus {
    InProgress,
    Completed,
    Failed,
    Stopping,
    Stopped,
}

impl TrainingJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
        }
    }
}

impl FromStr for TrainingJobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "InProgress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Stopping" => Ok(Self::Stopping),
            "Stopped" => Ok(Self::Stopped),
            other => Err(DomainError::validation(format!(
                "Unknown training job status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for TrainingJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a training job returned by a describe call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingJobDescription {
    pub name: String,
    pub status: TrainingJobStatus,
    pub model_artifacts: Option<String>,
    pub failure_reason: Option<String>,
}
