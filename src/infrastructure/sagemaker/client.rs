//! SageMaker control-plane client

use async_trait::async_trait;
use aws_sdk_sagemaker::error::DisplayErrorContext;
use aws_sdk_sagemaker::types::{
    AlgorithmSpecification, Channel, ContainerDefinition, DataSource as SmDataSource,
    OutputDataConfig, ProductionVariant, ProductionVariantInstanceType, ResourceConfig,
    S3DataDistribution, S3DataSource, S3DataType, StoppingCondition, TrainingInputMode,
    TrainingInstanceType,
};
use tracing::debug;

use crate::domain::deployment::{EndpointSpec, EndpointStatus, HostingService, ModelSpec};
use crate::domain::training::{
    DataSource, TrainingJobDescription, TrainingJobSpec, TrainingJobStatus, TrainingService,
    DEFAULT_VOLUME_SIZE_GB, TRAINING_CHANNEL,
};
use crate::domain::DomainError;

const SERVICE: &str = "sagemaker";

fn api_error<E: std::error::Error>(operation: &str, err: E) -> DomainError {
    DomainError::provider(
        SERVICE,
        format!("{} failed: {}", operation, DisplayErrorContext(err)),
    )
}

fn to_i32(value: u32, field: &str) -> Result<i32, DomainError> {
    i32::try_from(value)
        .map_err(|_| DomainError::validation(format!("{} {} is out of range", field, value)))
}

/// Real SageMaker client implementing the training and hosting seams
#[derive(Debug, Clone)]
pub struct SageMakerClient {
    client: aws_sdk_sagemaker::Client,
}

impl SageMakerClient {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_sagemaker::Client::new(config),
        }
    }

    fn input_channel(data_source: &DataSource) -> Option<Channel> {
        let DataSource::S3 { uri } = data_source else {
            return None;
        };

        let s3 = S3DataSource::builder()
            .s3_data_type(S3DataType::S3Prefix)
            .s3_uri(uri)
            .s3_data_distribution_type(S3DataDistribution::FullyReplicated)
            .build();

        let channel = Channel::builder()
            .channel_name(TRAINING_CHANNEL)
            .data_source(SmDataSource::builder().s3_data_source(s3).build())
            .build();

        Some(channel)
    }
}

#[async_trait]
impl TrainingService for SageMakerClient {
    async fn create_training_job(&self, spec: &TrainingJobSpec) -> Result<String, DomainError> {
        let algorithm = AlgorithmSpecification::builder()
            .training_image(&spec.image)
            .training_input_mode(TrainingInputMode::File)
            .build();

        let output = OutputDataConfig::builder()
            .s3_output_path(&spec.output_path)
            .build();

        let resources = ResourceConfig::builder()
            .instance_type(TrainingInstanceType::from(spec.instance.instance_type.as_str()))
            .instance_count(to_i32(spec.instance.instance_count, "instance count")?)
            .volume_size_in_gb(DEFAULT_VOLUME_SIZE_GB)
            .build();

        let stopping = StoppingCondition::builder()
            .max_runtime_in_seconds(spec.max_runtime_secs)
            .build();

        let mut request = self
            .client
            .create_training_job()
            .training_job_name(spec.name.as_str())
            .role_arn(&spec.role)
            .algorithm_specification(algorithm)
            .output_data_config(output)
            .resource_config(resources)
            .stopping_condition(stopping);

        for (key, value) in spec.wire_hyperparameters() {
            request = request.hyper_parameters(key, value);
        }

        for (key, value) in &spec.environment {
            request = request.environment(key, value);
        }

        if let Some(channel) = Self::input_channel(&spec.data_source) {
            request = request.input_data_config(channel);
        }

        debug!(job_name = %spec.name, "Sending CreateTrainingJob");
        let response = request
            .send()
            .await
            .map_err(|e| api_error("CreateTrainingJob", e))?;

        Ok(response.training_job_arn().unwrap_or_default().to_string())
    }

    async fn describe_training_job(&self, name: &str) -> Result<TrainingJobDescription, DomainError> {
        let response = self
            .client
            .describe_training_job()
            .training_job_name(name)
            .send()
            .await
            .map_err(|e| api_error("DescribeTrainingJob", e))?;

        let status = response
            .training_job_status()
            .ok_or_else(|| {
                DomainError::provider(SERVICE, format!("Training job '{}' has no status", name))
            })?
            .as_str()
            .parse::<TrainingJobStatus>()?;

        let model_artifacts = response
            .model_artifacts()
            .and_then(|artifacts| artifacts.s3_model_artifacts())
            .map(str::to_string);

        Ok(TrainingJobDescription {
            name: name.to_string(),
            status,
            model_artifacts,
            failure_reason: response.failure_reason().map(str::to_string),
        })
    }
}

#[async_trait]
impl HostingService for SageMakerClient {
    async fn create_model(&self, spec: &ModelSpec) -> Result<String, DomainError> {
        let mut container = ContainerDefinition::builder()
            .image(&spec.image)
            .model_data_url(&spec.artifact);

        for (key, value) in spec.container_environment() {
            container = container.environment(key, value);
        }

        debug!(model_name = %spec.name, "Sending CreateModel");
        let response = self
            .client
            .create_model()
            .model_name(spec.name.as_str())
            .execution_role_arn(&spec.role)
            .primary_container(container.build())
            .send()
            .await
            .map_err(|e| api_error("CreateModel", e))?;

        Ok(response.model_arn().unwrap_or_default().to_string())
    }

    async fn create_endpoint(&self, spec: &EndpointSpec) -> Result<String, DomainError> {
        let variant = ProductionVariant::builder()
            .variant_name(&spec.variant_name)
            .model_name(spec.model_name.as_str())
            .initial_instance_count(to_i32(spec.instance.instance_count, "instance count")?)
            .instance_type(ProductionVariantInstanceType::from(
                spec.instance.instance_type.as_str(),
            ))
            .initial_variant_weight(1.0)
            .build();

        debug!(config_name = %spec.config_name, "Sending CreateEndpointConfig");
        self.client
            .create_endpoint_config()
            .endpoint_config_name(spec.config_name.as_str())
            .production_variants(variant)
            .send()
            .await
            .map_err(|e| api_error("CreateEndpointConfig", e))?;

        debug!(endpoint_name = %spec.name, "Sending CreateEndpoint");
        let response = self
            .client
            .create_endpoint()
            .endpoint_name(spec.name.as_str())
            .endpoint_config_name(spec.config_name.as_str())
            .send()
            .await
            .map_err(|e| api_error("CreateEndpoint", e))?;

        Ok(response.endpoint_arn().unwrap_or_default().to_string())
    }

    async fn describe_endpoint(&self, name: &str) -> Result<EndpointStatus, DomainError> {
        let response = self
            .client
            .describe_endpoint()
            .endpoint_name(name)
            .send()
            .await
            .map_err(|e| api_error("DescribeEndpoint", e))?;

        response
            .endpoint_status()
            .ok_or_else(|| {
                DomainError::provider(SERVICE, format!("Endpoint '{}' has no status", name))
            })?
            .as_str()
            .parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dvc_source_has_no_channel() {
        assert!(SageMakerClient::input_channel(&DataSource::Dvc).is_none());
    }

    #[test]
    fn test_s3_source_becomes_training_channel() {
        let channel = SageMakerClient::input_channel(&DataSource::S3 {
            uri: "s3://bucket/datasets/mnist/".to_string(),
        })
        .unwrap();

        assert_eq!(channel.channel_name(), Some("training"));
    }

    #[test]
    fn test_instance_count_range() {
        assert_eq!(to_i32(2, "instance count").unwrap(), 2);
        assert!(to_i32(u32::MAX, "instance count").is_err());
    }
}
