//! Pipeline options: the axes the per-variant scripts used to hard-code

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::inference::{PayloadMode, SerializationContract};
use crate::domain::training::{
    DataSource, HyperparameterValue, InstanceShape, DEFAULT_MAX_RUNTIME_SECS,
};
use crate::domain::DomainError;

pub const DEFAULT_TRAINING_INSTANCE: &str = "ml.g4dn.xlarge";
pub const DEFAULT_SERVING_INSTANCE: &str = "ml.m5.large";
pub const TRAIN_ENTRY_POINT: &str = "src/mnist_sagemaker_ci_cd/lib/train.py";
pub const INFERENCE_ENTRY_POINT: &str = "src/mnist_sagemaker_ci_cd/lib/inference.py";

/// AWS Deep Learning Container registry account hosting the public PyTorch images
const DLC_ACCOUNT: &str = "763104351884";
const PYTORCH_INFERENCE_TAG: &str = "2.1.0-gpu-py310-cu118-ubuntu20.04-sagemaker";

/// Which model the training container fits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Convolutional digit classifier
    #[default]
    Mnist,
    /// BERTopic topic model
    Bertopic,
}

impl ModelVariant {
    pub fn default_hyperparameters(&self) -> BTreeMap<String, HyperparameterValue> {
        match self {
            Self::Mnist => BTreeMap::from([
                ("epochs".to_string(), HyperparameterValue::Integer(5)),
                ("backend".to_string(), HyperparameterValue::from("gloo")),
            ]),
            Self::Bertopic => BTreeMap::from([(
                "language".to_string(),
                HyperparameterValue::from("english"),
            )]),
        }
    }

    /// Payload shape this variant's inference script decodes
    pub fn payload_mode(&self) -> PayloadMode {
        match self {
            Self::Mnist => PayloadMode::Image,
            Self::Bertopic => PayloadMode::Json,
        }
    }

    /// Serving contract, used when deploying and when invoking
    pub fn contract(&self) -> SerializationContract {
        self.payload_mode().contract()
    }
}

impl FromStr for ModelVariant {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mnist" => Ok(Self::Mnist),
            "bertopic" => Ok(Self::Bertopic),
            other => Err(DomainError::validation(format!(
                "Unknown model variant '{}', expected 'mnist' or 'bertopic'",
                other
            ))),
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mnist => write!(f, "mnist"),
            Self::Bertopic => write!(f, "bertopic"),
        }
    }
}

/// Everything that varies between pipeline runs
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub model: ModelVariant,
    pub training_instance: InstanceShape,
    pub serving_instance: InstanceShape,
    /// Overrides merged on top of the variant defaults
    pub hyperparameters: BTreeMap<String, HyperparameterValue>,
    pub environment: BTreeMap<String, String>,
    pub data_source: DataSource,
    /// Block until the training job reaches a terminal state
    pub wait: bool,
    /// Wire the job to Weights & Biases
    pub track: bool,
    pub poll_interval: Duration,
    pub max_runtime_secs: i32,
    /// Serving image; defaults to the regional PyTorch inference container
    pub serving_image: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            model: ModelVariant::default(),
            training_instance: InstanceShape {
                instance_type: DEFAULT_TRAINING_INSTANCE.to_string(),
                instance_count: 1,
            },
            serving_instance: InstanceShape {
                instance_type: DEFAULT_SERVING_INSTANCE.to_string(),
                instance_count: 1,
            },
            hyperparameters: BTreeMap::new(),
            environment: BTreeMap::new(),
            data_source: DataSource::default(),
            wait: false,
            track: false,
            poll_interval: Duration::from_secs(30),
            max_runtime_secs: DEFAULT_MAX_RUNTIME_SECS,
            serving_image: None,
        }
    }
}

impl PipelineOptions {
    pub fn hyperparameters(&self) -> BTreeMap<String, HyperparameterValue> {
        let mut merged = self.model.default_hyperparameters();
        merged.extend(self.hyperparameters.clone());
        merged
    }

    pub fn serving_image(&self, region: &str) -> String {
        self.serving_image.clone().unwrap_or_else(|| {
            format!(
                "{}.dkr.ecr.{}.amazonaws.com/pytorch-inference:{}",
                DLC_ACCOUNT, region, PYTORCH_INFERENCE_TAG
            )
        })
    }
}
