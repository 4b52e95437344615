//! CLI for the SageMaker CI/CD pipeline
//!
//! - `settings`: print the resolved CI settings
//! - `fit`: submit a training job
//! - `deploy`: deploy a trained model to an endpoint
//! - `run`: fit, wait and deploy
//! - `serve`: run the inference façade

pub mod pipeline;
pub mod serve;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::domain::pipeline::{
    ModelVariant, PipelineOptions, DEFAULT_SERVING_INSTANCE, DEFAULT_TRAINING_INSTANCE,
};
use crate::domain::training::{parse_hyperparameter, DataSource, InstanceShape};
use crate::domain::DomainError;
use crate::infrastructure::logging;

/// Train, deploy and serve SageMaker models from CI
#[derive(Parser)]
#[command(name = "sagemaker-ci-cd")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the resolved CI settings as JSON (secrets omitted)
    Settings,

    /// Submit a training job named after the commit
    Fit(pipeline::FitArgs),

    /// Deploy the model trained for this commit to an endpoint
    Deploy(pipeline::DeployArgs),

    /// Train, wait for completion and deploy
    Run(pipeline::RunArgs),

    /// Run the inference façade
    Serve,
}

/// Flags shared by every pipeline command
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Record requests against an in-memory SageMaker instead of AWS
    #[arg(long)]
    pub dry_run: bool,

    /// Where to write the markdown status report
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

/// Training job flags
#[derive(Args, Debug, Clone)]
pub struct TrainingArgs {
    /// Model variant to train
    #[arg(long, default_value = "mnist")]
    pub model: ModelVariant,

    #[arg(long, default_value = DEFAULT_TRAINING_INSTANCE)]
    pub instance_type: String,

    #[arg(long, default_value_t = 1)]
    pub instance_count: u32,

    /// Hyperparameter override, repeatable
    #[arg(long = "hyperparameter", value_name = "KEY=VALUE")]
    pub hyperparameters: Vec<String>,

    /// Extra container environment variable, repeatable
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub environment: Vec<String>,

    /// `dvc` to let the container pull its data, or an s3:// prefix
    #[arg(long, default_value = "dvc")]
    pub data_source: DataSource,

    /// Report the run to Weights & Biases
    #[arg(long)]
    pub track: bool,

    #[arg(long)]
    pub max_runtime_secs: Option<i32>,
}

/// Endpoint flags
#[derive(Args, Debug, Clone)]
pub struct ServingArgs {
    #[arg(long, default_value = DEFAULT_SERVING_INSTANCE)]
    pub serving_instance_type: String,

    #[arg(long, default_value_t = 1)]
    pub serving_instance_count: u32,

    /// Serving container image; defaults to the regional PyTorch inference image
    #[arg(long)]
    pub serving_image: Option<String>,
}

impl TrainingArgs {
    /// Apply the training flags on top of `options`
    pub fn apply(&self, options: &mut PipelineOptions) -> Result<(), DomainError> {
        options.model = self.model;
        options.training_instance = InstanceShape::new(&self.instance_type, self.instance_count)?;
        options.hyperparameters = self
            .hyperparameters
            .iter()
            .map(|raw| parse_hyperparameter(raw))
            .collect::<Result<_, DomainError>>()?;
        options.environment = self
            .environment
            .iter()
            .map(|raw| parse_env_pair(raw))
            .collect::<Result<_, DomainError>>()?;
        options.data_source = self.data_source.clone();
        options.track = self.track;

        if let Some(secs) = self.max_runtime_secs {
            options.max_runtime_secs = secs;
        }

        Ok(())
    }
}

impl ServingArgs {
    pub fn apply(&self, options: &mut PipelineOptions) -> Result<(), DomainError> {
        options.serving_instance =
            InstanceShape::new(&self.serving_instance_type, self.serving_instance_count)?;
        options.serving_image = self.serving_image.clone();
        Ok(())
    }
}

/// Options seeded from the application config
pub fn base_options(config: &AppConfig) -> PipelineOptions {
    PipelineOptions {
        poll_interval: std::time::Duration::from_secs(config.pipeline.poll_interval_secs),
        ..Default::default()
    }
}

fn parse_env_pair(raw: &str) -> Result<(String, String), DomainError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(DomainError::validation(format!(
            "Expected KEY=VALUE, got '{}'",
            raw
        ))),
    }
}

/// Load `.env` and the application config, then start logging
pub fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);
    Ok(config)
}
