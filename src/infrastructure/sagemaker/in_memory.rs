//! In-memory SageMaker used for dry runs and tests
//!
//! Training jobs complete as soon as they are submitted and endpoints are
//! in service as soon as they are created. Nothing leaves the process.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::info;

use crate::domain::deployment::{EndpointSpec, EndpointStatus, HostingService, ModelSpec};
use crate::domain::inference::{InferenceClient, SerializationContract};
use crate::domain::training::{
    TrainingJobDescription, TrainingJobSpec, TrainingJobStatus, TrainingService,
};
use crate::domain::DomainError;

/// A request recorded by [`InMemorySageMaker::invoke`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub endpoint_name: String,
    pub contract: SerializationContract,
    pub body: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    jobs: BTreeMap<String, TrainingJobSpec>,
    models: BTreeMap<String, ModelSpec>,
    endpoints: BTreeMap<String, EndpointSpec>,
    responses: HashMap<String, Vec<u8>>,
    invocations: Vec<Invocation>,
}

#[derive(Debug, Default)]
pub struct InMemorySageMaker {
    state: RwLock<State>,
}

fn lock_error(e: impl std::fmt::Display) -> DomainError {
    DomainError::internal(format!("Failed to acquire lock: {}", e))
}

fn arn(region: &str, kind: &str, name: &str) -> String {
    format!("arn:aws:sagemaker:{}:local:{}/{}", region, kind, name)
}

impl InMemorySageMaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned JSON body returned when `endpoint_name` is invoked
    pub fn with_response(self, endpoint_name: &str, response: serde_json::Value) -> Self {
        if let Ok(mut state) = self.state.write() {
            state
                .responses
                .insert(endpoint_name.to_string(), response.to_string().into_bytes());
        }
        self
    }

    /// Artifact location a completed job reports, following SageMaker's layout
    pub fn artifact_uri(spec: &TrainingJobSpec) -> String {
        let prefix = if spec.output_path.ends_with('/') {
            spec.output_path.clone()
        } else {
            format!("{}/", spec.output_path)
        };
        format!("{}{}/output/model.tar.gz", prefix, spec.name)
    }

    pub fn training_jobs(&self) -> Result<Vec<TrainingJobSpec>, DomainError> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.jobs.values().cloned().collect())
    }

    pub fn models(&self) -> Result<Vec<ModelSpec>, DomainError> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.models.values().cloned().collect())
    }

    pub fn endpoints(&self) -> Result<Vec<EndpointSpec>, DomainError> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.endpoints.values().cloned().collect())
    }

    pub fn invocations(&self) -> Result<Vec<Invocation>, DomainError> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.invocations.clone())
    }
}

#[async_trait]
impl TrainingService for InMemorySageMaker {
    async fn create_training_job(&self, spec: &TrainingJobSpec) -> Result<String, DomainError> {
        let mut state = self.state.write().map_err(lock_error)?;
        let name = spec.name.to_string();

        if state.jobs.contains_key(&name) {
            return Err(DomainError::provider(
                "sagemaker",
                format!("ResourceInUse: Training job names must be unique; '{}' already exists", name),
            ));
        }

        info!(job_name = %name, "Recorded training job (dry run)");
        state.jobs.insert(name.clone(), spec.clone());
        Ok(arn(&spec.region, "training-job", &name))
    }

    async fn describe_training_job(&self, name: &str) -> Result<TrainingJobDescription, DomainError> {
        let state = self.state.read().map_err(lock_error)?;
        let spec = state.jobs.get(name).ok_or_else(|| {
            DomainError::not_found(format!("Training job '{}' does not exist", name))
        })?;

        Ok(TrainingJobDescription {
            name: name.to_string(),
            status: TrainingJobStatus::Completed,
            model_artifacts: Some(Self::artifact_uri(spec)),
            failure_reason: None,
        })
    }
}

#[async_trait]
impl HostingService for InMemorySageMaker {
    async fn create_model(&self, spec: &ModelSpec) -> Result<String, DomainError> {
        let mut state = self.state.write().map_err(lock_error)?;
        let name = spec.name.to_string();

        if state.models.contains_key(&name) {
            return Err(DomainError::provider(
                "sagemaker",
                format!("ValidationException: Cannot create already existing model '{}'", name),
            ));
        }

        info!(model_name = %name, "Recorded model (dry run)");
        state.models.insert(name.clone(), spec.clone());
        Ok(arn(&spec.region, "model", &name))
    }

    async fn create_endpoint(&self, spec: &EndpointSpec) -> Result<String, DomainError> {
        let mut state = self.state.write().map_err(lock_error)?;
        let name = spec.name.to_string();

        let region = state
            .models
            .get(spec.model_name.as_str())
            .map(|model| model.region.clone())
            .ok_or_else(|| {
                DomainError::provider(
                    "sagemaker",
                    format!("ValidationException: Could not find model '{}'", spec.model_name),
                )
            })?;

        if state.endpoints.contains_key(&name) {
            return Err(DomainError::provider(
                "sagemaker",
                format!("ValidationException: Cannot create already existing endpoint '{}'", name),
            ));
        }

        info!(endpoint_name = %name, "Recorded endpoint (dry run)");
        state.endpoints.insert(name.clone(), spec.clone());
        Ok(arn(&region, "endpoint", &name))
    }

    async fn describe_endpoint(&self, name: &str) -> Result<EndpointStatus, DomainError> {
        let state = self.state.read().map_err(lock_error)?;

        if state.endpoints.contains_key(name) || state.responses.contains_key(name) {
            Ok(EndpointStatus::InService)
        } else {
            Err(DomainError::not_found(format!("Endpoint '{}' does not exist", name)))
        }
    }
}

#[async_trait]
impl InferenceClient for InMemorySageMaker {
    async fn invoke(
        &self,
        endpoint_name: &str,
        contract: SerializationContract,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, DomainError> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.invocations.push(Invocation {
            endpoint_name: endpoint_name.to_string(),
            contract,
            body,
        });

        state.responses.get(endpoint_name).cloned().ok_or_else(|| {
            DomainError::provider(
                "endpoint",
                format!("Endpoint '{}' is not available", endpoint_name),
            )
        })
    }
}
