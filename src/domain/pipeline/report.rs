//! Markdown status reports picked up by the CI comment step

use std::path::Path;

use super::TrainingSubmission;
use crate::config::Settings;
use crate::domain::deployment::Deployment;
use crate::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    heading: String,
    rows: Vec<(String, String)>,
}

impl StatusReport {
    pub fn training(settings: &Settings, submission: &TrainingSubmission) -> Self {
        let mut rows = vec![
            ("Job Name".to_string(), submission.job_name.clone()),
            (
                "Training Instance".to_string(),
                format!(
                    "{} x {}",
                    submission.instance_type, submission.instance_count
                ),
            ),
        ];

        if let Some(status) = submission.final_status {
            rows.push(("Status".to_string(), status.to_string()));
        }

        if let Some(reason) = &submission.failure_reason {
            rows.push(("Failure Reason".to_string(), reason.replace('|', "\\|")));
        }

        if let Some(url) = &submission.tracking_url {
            rows.push(("W&B :sparkles: Job URL".to_string(), link(url)));
        }

        rows.push(("S3 Artifacts".to_string(), link(&settings.s3_http_url)));
        rows.push(("Training Logs".to_string(), link(&settings.cloudwatch_logs)));

        Self {
            heading: ":crystal_ball: Hi! Sagemaker training launch detected. :rocket:".to_string(),
            rows,
        }
    }

    pub fn deployment(deployment: &Deployment) -> Self {
        Self {
            heading: ":crystal_ball: Hi! Sagemaker endpoint deployment detected. :rocket:"
                .to_string(),
            rows: vec![
                ("Endpoint Name".to_string(), deployment.endpoint_name.clone()),
                ("Model Name".to_string(), deployment.model_name.clone()),
                ("Serving Instance".to_string(), deployment.instance_type.clone()),
                ("Model Artifact".to_string(), deployment.artifact.clone()),
            ],
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "{} \n\nYou can view the details of this run in the table by clicking on the link below.\n\n",
            self.heading
        );
        out.push_str("| Item | Value |\n| --- | --- |\n");

        for (item, value) in &self.rows {
            out.push_str(&format!("| {} | {} |\n", item, value));
        }

        out
    }

    /// Write several reports into one file, separated by a blank line
    pub async fn write_all(
        reports: &[StatusReport],
        path: impl AsRef<Path>,
    ) -> Result<(), DomainError> {
        let rendered: Vec<String> = reports.iter().map(StatusReport::render).collect();
        tokio::fs::write(path, rendered.join("\n")).await?;
        Ok(())
    }
}

fn link(url: &str) -> String {
    format!("[Here]({})", url)
}
