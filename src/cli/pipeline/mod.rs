//! Pipeline commands - settings, fit, deploy and run

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use tracing::{info, warn};

use super::{base_options, bootstrap, CommonArgs, ServingArgs, TrainingArgs};
use crate::config::{AppConfig, Settings};
use crate::domain::deployment::{Deployment, HostingService};
use crate::domain::pipeline::{
    ModelVariant, Pipeline, PipelineOptions, StatusReport, TrainingSubmission,
};
use crate::domain::training::TrainingService;
use crate::infrastructure::sagemaker::{load_aws_config, InMemorySageMaker, SageMakerClient};

#[derive(Args, Debug, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub training: TrainingArgs,

    /// Block until the training job finishes
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    /// Model variant, selects the serving contract
    #[arg(long, default_value = "mnist")]
    pub model: ModelVariant,

    /// Training job to take the artifact from; defaults to this commit's job
    #[arg(long)]
    pub job_name: Option<String>,

    /// Deploy this artifact instead of looking it up
    #[arg(long, value_name = "S3_URI")]
    pub artifact: Option<String>,

    #[command(flatten)]
    pub serving: ServingArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub training: TrainingArgs,

    #[command(flatten)]
    pub serving: ServingArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// `settings`
pub async fn settings() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

/// `fit`
pub async fn fit(args: FitArgs) -> anyhow::Result<()> {
    let config = bootstrap()?;

    let mut options = base_options(&config);
    args.training.apply(&mut options)?;
    options.wait = args.wait;

    let pipeline = build_pipeline(options, args.common.dry_run).await?;
    let submission = fit_and_report(&pipeline, &report_path(&config, &args.common)).await?;

    println!("{}", serde_json::to_string_pretty(&submission)?);
    Ok(())
}

/// `deploy`
pub async fn deploy(args: DeployArgs) -> anyhow::Result<()> {
    let config = bootstrap()?;

    let mut options = base_options(&config);
    options.model = args.model;
    args.serving.apply(&mut options)?;

    let pipeline = build_pipeline(options, args.common.dry_run).await?;

    let artifact = match &args.artifact {
        Some(artifact) => artifact.clone(),
        None => {
            let job_name = match &args.job_name {
                Some(name) => name.clone(),
                None => pipeline.resource_name()?.to_string(),
            };
            pipeline.locate_artifact(&job_name).await?
        }
    };

    let deployment = pipeline.deploy(&artifact).await?;

    let report = StatusReport::deployment(&deployment);
    write_reports(&[report], &report_path(&config, &args.common)).await;

    println!("{}", serde_json::to_string_pretty(&deployment)?);
    Ok(())
}

/// `run`
pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = bootstrap()?;

    let mut options = base_options(&config);
    args.training.apply(&mut options)?;
    args.serving.apply(&mut options)?;

    let pipeline = build_pipeline(options, args.common.dry_run).await?;
    let (submission, deployment) =
        run_and_report(&pipeline, &report_path(&config, &args.common)).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "training": submission,
            "deployment": deployment,
        }))?
    );
    Ok(())
}

/// Submit, report, then fail if a waited-on job did not complete
async fn fit_and_report(pipeline: &Pipeline, path: &Path) -> anyhow::Result<TrainingSubmission> {
    let submission = pipeline.submit_training().await?;

    let report = StatusReport::training(pipeline.settings(), &submission);
    write_reports(&[report], path).await;

    submission.ensure_completed()?;
    Ok(submission)
}

/// Train and deploy; the training report is written even when deployment
/// never starts
async fn run_and_report(
    pipeline: &Pipeline,
    path: &Path,
) -> anyhow::Result<(TrainingSubmission, Deployment)> {
    let submission = pipeline.submit_and_wait().await?;
    let training_report = StatusReport::training(pipeline.settings(), &submission);

    let deployment = match pipeline.deploy_submission(&submission).await {
        Ok(deployment) => deployment,
        Err(e) => {
            write_reports(&[training_report], path).await;
            return Err(e.into());
        }
    };

    let reports = [training_report, StatusReport::deployment(&deployment)];
    write_reports(&reports, path).await;

    Ok((submission, deployment))
}

async fn build_pipeline(options: PipelineOptions, dry_run: bool) -> anyhow::Result<Pipeline> {
    let settings = Arc::new(Settings::from_env()?);

    let training: Arc<dyn TrainingService>;
    let hosting: Arc<dyn HostingService>;

    if dry_run {
        info!("Dry run: requests are recorded in memory, nothing is sent to AWS");
        let sagemaker = Arc::new(InMemorySageMaker::new());
        training = sagemaker.clone();
        hosting = sagemaker;
    } else {
        let aws_config = load_aws_config(&settings.aws_region).await;
        let client = Arc::new(SageMakerClient::new(&aws_config));
        training = client.clone();
        hosting = client;
    }

    Ok(Pipeline::new(settings, training, hosting, options))
}

fn report_path(config: &AppConfig, common: &CommonArgs) -> PathBuf {
    common
        .report
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.pipeline.report_path))
}

async fn write_reports(reports: &[StatusReport], path: &Path) {
    match StatusReport::write_all(reports, path).await {
        Ok(()) => info!(path = %path.display(), "Wrote status report"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to write status report"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::inference::Predictor;
    use crate::domain::training::{MockTrainingService, TrainingJobDescription, TrainingJobStatus};

    fn settings() -> Arc<Settings> {
        let env: HashMap<String, String> = HashMap::from([
            ("EVENT_SHA".to_string(), "abc1234def".to_string()),
            ("GITHUB_REPOSITORY".to_string(), "octo/mnist-sagemaker-ci-cd".to_string()),
            ("SAGEMAKER_IAM_ROLE".to_string(), "arn:aws:iam::123:role/sm".to_string()),
            ("SAGEMAKER_ECR_IMAGE".to_string(), "123.dkr.ecr/repo:tag".to_string()),
        ]);
        Arc::new(Settings::resolve(&env).unwrap())
    }

    fn demo_png() -> Vec<u8> {
        let image = image::DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            28,
            28,
            image::Luma([200]),
        ));
        let mut buf = std::io::Cursor::new(Vec::new());
        image.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn test_end_to_end_against_in_memory_sagemaker() {
        let sagemaker = Arc::new(InMemorySageMaker::new());
        let pipeline = Pipeline::new(
            settings(),
            sagemaker.clone(),
            sagemaker.clone(),
            PipelineOptions {
                poll_interval: std::time::Duration::ZERO,
                ..Default::default()
            },
        );

        let (submission, deployment) = pipeline.run().await.unwrap();

        assert_eq!(submission.job_name, "abc1234");
        assert_eq!(submission.final_status, Some(TrainingJobStatus::Completed));
        assert_eq!(deployment.endpoint_name, "abc1234");
        assert_eq!(
            deployment.artifact,
            "s3://with-context-sagemaker/fits/mnist-sagemaker-ci-cd/main/abc1234/output/model.tar.gz"
        );

        let models = sagemaker.models().unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(
            models[0].container_environment()["SAGEMAKER_DEFAULT_INVOCATIONS_ACCEPT"],
            "application/json"
        );
        assert_eq!(sagemaker.endpoints().unwrap()[0].instance.instance_type, "ml.m5.large");

        // a second run for the same commit collides on the job name
        assert!(pipeline.run().await.is_err());
        assert_eq!(sagemaker.training_jobs().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deployed_contract_matches_invocation_contract() {
        for (model, upload) in [
            (ModelVariant::Mnist, demo_png()),
            (ModelVariant::Bertopic, b"gpu prices are falling".to_vec()),
        ] {
            let sagemaker = Arc::new(
                InMemorySageMaker::new()
                    .with_response("abc1234", serde_json::json!({ "prediction": [7] })),
            );
            let pipeline = Pipeline::new(
                settings(),
                sagemaker.clone(),
                sagemaker.clone(),
                PipelineOptions {
                    model,
                    ..Default::default()
                },
            );

            let deployment = pipeline.deploy("s3://b/abc1234/output/model.tar.gz").await.unwrap();
            Predictor::new(
                sagemaker.clone(),
                deployment.endpoint_name,
                model.payload_mode(),
            )
            .predict(&upload)
            .await
            .unwrap();

            let deployed = &sagemaker.models().unwrap()[0];
            let invocation = &sagemaker.invocations().unwrap()[0];
            assert_eq!(deployed.contract, invocation.contract, "{}", model);
        }
    }

    fn failing_training(status: TrainingJobStatus) -> MockTrainingService {
        let mut training = MockTrainingService::new();
        training
            .expect_create_training_job()
            .returning(|_| Ok("arn:training-job/abc1234".to_string()));
        training.expect_describe_training_job().returning(move |name| {
            Ok(TrainingJobDescription {
                name: name.to_string(),
                status,
                model_artifacts: None,
                failure_reason: Some("AlgorithmError: exit code 1".to_string()),
            })
        });
        training
    }

    fn temp_report() -> PathBuf {
        std::env::temp_dir().join(format!("details-{}.txt", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_failed_fit_still_writes_report() {
        let pipeline = Pipeline::new(
            settings(),
            Arc::new(failing_training(TrainingJobStatus::Failed)),
            Arc::new(InMemorySageMaker::new()),
            PipelineOptions {
                wait: true,
                poll_interval: std::time::Duration::ZERO,
                ..Default::default()
            },
        );
        let path = temp_report();

        let err = fit_and_report(&pipeline, &path).await.unwrap_err();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(err.to_string().contains("AlgorithmError: exit code 1"));
        assert!(written.contains("| Job Name | abc1234 |"));
        assert!(written.contains("| Status | Failed |"));
        assert!(written.contains("| Failure Reason | AlgorithmError: exit code 1 |"));
    }

    #[tokio::test]
    async fn test_failed_run_reports_training_and_skips_deploy() {
        let hosting = Arc::new(InMemorySageMaker::new());
        let pipeline = Pipeline::new(
            settings(),
            Arc::new(failing_training(TrainingJobStatus::Stopped)),
            hosting.clone(),
            PipelineOptions {
                poll_interval: std::time::Duration::ZERO,
                ..Default::default()
            },
        );
        let path = temp_report();

        assert!(run_and_report(&pipeline, &path).await.is_err());
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(written.contains("| Status | Stopped |"));
        assert!(!written.contains("endpoint deployment detected"));
        assert!(hosting.models().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_write_failure_is_not_fatal() {
        let missing_dir = std::env::temp_dir()
            .join(uuid::Uuid::new_v4().to_string())
            .join("details.txt");

        write_reports(&[], &missing_dir).await;
        assert!(!missing_dir.exists());
    }

    #[test]
    fn test_report_path_prefers_flag() {
        let config = AppConfig::default();
        assert_eq!(
            report_path(&config, &CommonArgs::default()),
            PathBuf::from("details.txt")
        );

        let common = CommonArgs {
            dry_run: false,
            report: Some(PathBuf::from("out/report.md")),
        };
        assert_eq!(report_path(&config, &common), PathBuf::from("out/report.md"));
    }
}
