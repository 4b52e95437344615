//! Train → locate artifact → deploy

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::options::{PipelineOptions, INFERENCE_ENTRY_POINT, TRAIN_ENTRY_POINT};
use crate::config::Settings;
use crate::domain::deployment::{Deployment, EndpointSpec, HostingService, ModelSpec};
use crate::domain::training::{
    TrainingJobDescription, TrainingJobSpec, TrainingJobStatus, TrainingService,
};
use crate::domain::{DomainError, ResourceName};

/// Experiment-tracking run the training container reports into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingRun {
    pub run_id: String,
    pub project: String,
    pub group: String,
    pub url: Option<String>,
    api_key: String,
}

impl TrackingRun {
    pub fn start(settings: &Settings) -> Result<Self, DomainError> {
        let api_key = settings.wandb_api_key.clone().ok_or_else(|| {
            DomainError::configuration("WANDB_API_KEY must be set when tracking is enabled")
        })?;

        let run_id: String = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let project = settings.github_repo_name.clone();
        let url = settings
            .wandb_entity
            .as_ref()
            .map(|entity| format!("https://wandb.ai/{}/{}/runs/{}", entity, project, run_id));

        Ok(Self {
            run_id,
            project,
            group: settings.short_sha.clone(),
            url,
            api_key,
        })
    }

    pub fn environment(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("WANDB_RUN_ID".to_string(), self.run_id.clone()),
            ("WANDB_API_KEY".to_string(), self.api_key.clone()),
            ("WANDB_PROJECT".to_string(), self.project.clone()),
            ("WANDB_RUN_GROUP".to_string(), self.group.clone()),
        ])
    }
}

/// Outcome of submitting (and optionally waiting for) a training job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingSubmission {
    pub job_name: String,
    pub job_arn: String,
    pub instance_type: String,
    pub instance_count: u32,
    /// Set only when the submission waited for a terminal state
    pub final_status: Option<TrainingJobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub tracking_url: Option<String>,
}

impl TrainingSubmission {
    /// A job that ended `Failed` or `Stopped` is an error carrying its reason
    pub fn ensure_completed(&self) -> Result<(), DomainError> {
        match self.final_status {
            Some(status @ (TrainingJobStatus::Failed | TrainingJobStatus::Stopped)) => {
                Err(DomainError::provider(
                    "sagemaker",
                    format!(
                        "Training job '{}' ended with status {}: {}",
                        self.job_name,
                        status,
                        self.failure_reason
                            .as_deref()
                            .unwrap_or("no failure reason reported")
                    ),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// One parameterised training/deployment pipeline
#[derive(Clone)]
pub struct Pipeline {
    settings: Arc<Settings>,
    training: Arc<dyn TrainingService>,
    hosting: Arc<dyn HostingService>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        settings: Arc<Settings>,
        training: Arc<dyn TrainingService>,
        hosting: Arc<dyn HostingService>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            settings,
            training,
            hosting,
            options,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Job, model and endpoint name derived from the commit
    pub fn resource_name(&self) -> Result<ResourceName, DomainError> {
        ResourceName::new(self.settings.job_name())
    }

    pub fn training_spec(&self, tracking: Option<&TrackingRun>) -> Result<TrainingJobSpec, DomainError> {
        let mut environment = BTreeMap::from([(
            "GITHUB_SHA".to_string(),
            self.settings.short_sha.clone(),
        )]);
        environment.extend(self.options.environment.clone());

        if let Some(run) = tracking {
            environment.extend(run.environment());
        }

        Ok(TrainingJobSpec {
            name: self.resource_name()?,
            image: self.settings.require_ecr_image()?.to_string(),
            role: self.settings.require_iam_role()?.to_string(),
            entry_point: TRAIN_ENTRY_POINT.to_string(),
            source_bundle: self.settings.source_bundle_uri(),
            region: self.settings.aws_region.clone(),
            instance: self.options.training_instance.clone(),
            hyperparameters: self.options.hyperparameters(),
            environment,
            data_source: self.options.data_source.clone(),
            output_path: self.settings.output_s3_uri.clone(),
            max_runtime_secs: self.options.max_runtime_secs,
        })
    }

    /// Submit the training job, waiting for it when the options say so.
    /// A job that fails while waited on is still returned; see
    /// [`TrainingSubmission::ensure_completed`].
    pub async fn submit_training(&self) -> Result<TrainingSubmission, DomainError> {
        self.submit(self.options.wait).await
    }

    /// Submit the training job and wait for a terminal state
    pub async fn submit_and_wait(&self) -> Result<TrainingSubmission, DomainError> {
        self.submit(true).await
    }

    async fn submit(&self, wait: bool) -> Result<TrainingSubmission, DomainError> {
        let tracking = if self.options.track {
            Some(TrackingRun::start(&self.settings)?)
        } else {
            None
        };

        let spec = self.training_spec(tracking.as_ref())?;
        info!(
            job_name = %spec.name,
            model = %self.options.model,
            instance_type = %spec.instance.instance_type,
            instance_count = spec.instance.instance_count,
            data_source = %spec.data_source,
            wait,
            "Submitting training job"
        );

        let job_arn = self.training.create_training_job(&spec).await?;
        info!(job_name = %spec.name, job_arn = %job_arn, "Training job submitted");

        let (final_status, failure_reason) = if wait {
            let description = self.poll_until_terminal(spec.name.as_str()).await?;
            (Some(description.status), description.failure_reason)
        } else {
            (None, None)
        };

        Ok(TrainingSubmission {
            job_name: spec.name.to_string(),
            job_arn,
            instance_type: spec.instance.instance_type,
            instance_count: spec.instance.instance_count,
            final_status,
            failure_reason,
            tracking_url: tracking.and_then(|run| run.url),
        })
    }

    /// Poll until the job reaches a terminal state
    async fn poll_until_terminal(
        &self,
        job_name: &str,
    ) -> Result<TrainingJobDescription, DomainError> {
        loop {
            let description = self.training.describe_training_job(job_name).await?;
            debug!(job_name, status = %description.status, "Polled training job");

            if description.status.is_terminal() {
                if description.status == TrainingJobStatus::Completed {
                    info!(job_name, "Training job completed");
                } else {
                    warn!(job_name, status = %description.status, "Training job did not complete");
                }
                return Ok(description);
            }

            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Model artifact of a completed training job
    pub async fn locate_artifact(&self, job_name: &str) -> Result<String, DomainError> {
        let description = self.training.describe_training_job(job_name).await?;

        if description.status != TrainingJobStatus::Completed {
            return Err(DomainError::not_found(format!(
                "Training job '{}' has no artifact yet (status: {})",
                job_name, description.status
            )));
        }

        let artifact = description.model_artifacts.ok_or_else(|| {
            DomainError::not_found(format!("Training job '{}' produced no model artifact", job_name))
        })?;

        info!(job_name, artifact = %artifact, "Located model artifact");
        Ok(artifact)
    }

    pub fn model_spec(&self, artifact: &str) -> Result<ModelSpec, DomainError> {
        Ok(ModelSpec {
            name: self.resource_name()?,
            image: self.options.serving_image(&self.settings.aws_region),
            role: self.settings.require_iam_role()?.to_string(),
            artifact: artifact.to_string(),
            entry_point: INFERENCE_ENTRY_POINT.to_string(),
            source_bundle: self.settings.source_bundle_uri(),
            region: self.settings.aws_region.clone(),
            environment: BTreeMap::new(),
            contract: self.options.model.contract(),
        })
    }

    /// Register the model and stand up an endpoint for it
    pub async fn deploy(&self, artifact: &str) -> Result<Deployment, DomainError> {
        let model = self.model_spec(artifact)?;
        let endpoint = EndpointSpec::for_model(&model.name, self.options.serving_instance.clone());

        info!(
            model_name = %model.name,
            image = %model.image,
            content_type = model.contract.content_type,
            "Creating model"
        );
        self.hosting.create_model(&model).await?;

        info!(
            endpoint_name = %endpoint.name,
            instance_type = %endpoint.instance.instance_type,
            instance_count = endpoint.instance.instance_count,
            "Creating endpoint"
        );
        let endpoint_arn = self.hosting.create_endpoint(&endpoint).await?;

        info!(endpoint_name = %endpoint.name, "Deployed model to endpoint");

        Ok(Deployment {
            model_name: model.name.to_string(),
            endpoint_name: endpoint.name.to_string(),
            endpoint_arn,
            instance_type: endpoint.instance.instance_type,
            artifact: model.artifact,
        })
    }

    /// Locate the artifact of a finished submission and deploy it
    pub async fn deploy_submission(
        &self,
        submission: &TrainingSubmission,
    ) -> Result<Deployment, DomainError> {
        submission.ensure_completed()?;
        let artifact = self.locate_artifact(&submission.job_name).await?;
        self.deploy(&artifact).await
    }

    /// Full pipeline: train (always waiting), locate the artifact, deploy
    pub async fn run(&self) -> Result<(TrainingSubmission, Deployment), DomainError> {
        let submission = self.submit_and_wait().await?;
        let deployment = self.deploy_submission(&submission).await?;
        Ok((submission, deployment))
    }
}
