//! CI settings resolved from the process environment
//!
//! Every field has a fallback so the pipeline can be exercised locally, but
//! nothing account-bound (role ARNs, account ids, tokens) is ever defaulted.
//! Derived storage locations are validated here so a malformed value fails
//! at startup instead of midway through a submission.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::domain::DomainError;

pub const DEFAULT_REF_NAME: &str = "main";
pub const DEFAULT_SHA: &str = "0000000000000000000000000000000000000000";
pub const DEFAULT_REPOSITORY: &str = "local/mnist-sagemaker-ci-cd";
pub const DEFAULT_ACTOR: &str = "local";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_BUCKET: &str = "with-context-sagemaker";
pub const DEFAULT_ECR_REPOSITORY: &str = "with-context-sagemaker-container";

/// Length of the abbreviated commit id used for job and endpoint names
pub const SHORT_SHA_LENGTH: usize = 7;

static S3_URI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^s3://[a-z0-9][a-z0-9.\-]{1,61}[a-z0-9](/.*)?$").unwrap());

static HTTPS_URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https://[^\s/]+(/\S*)?$").unwrap());

/// Source of environment variables
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from the current process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Immutable CI/AWS settings for one process invocation
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub github_ref_name: String,
    pub github_sha: String,
    pub short_sha: String,
    pub github_repository: String,
    pub github_repo_name: String,
    pub github_actor: String,
    #[serde(skip_serializing)]
    pub github_token: Option<String>,

    pub aws_region: String,
    pub bucket: String,
    pub output_s3_uri: String,
    pub s3_http_url: String,
    pub ecr_image: Option<String>,
    pub iam_role: Option<String>,
    pub cloudwatch_logs: String,

    #[serde(skip_serializing)]
    pub wandb_api_key: Option<String>,
    pub wandb_entity: Option<String>,
}

impl Settings {
    /// Resolve settings from the process environment
    pub fn from_env() -> Result<Self, DomainError> {
        Self::resolve(&ProcessEnv)
    }

    /// Resolve settings from an arbitrary environment source
    pub fn resolve(env: &impl EnvSource) -> Result<Self, DomainError> {
        let lookup = |key: &str| env.get(key).filter(|v| !v.trim().is_empty());

        let github_ref_name = lookup("GITHUB_REF_NAME").unwrap_or_else(|| DEFAULT_REF_NAME.into());
        let github_sha = lookup("EVENT_SHA")
            .or_else(|| lookup("GITHUB_SHA"))
            .unwrap_or_else(|| DEFAULT_SHA.into());
        let short_sha = short_sha(&github_sha);
        let github_repository =
            lookup("GITHUB_REPOSITORY").unwrap_or_else(|| DEFAULT_REPOSITORY.into());
        let github_repo_name = repo_name(&github_repository)?;
        let github_actor = lookup("GITHUB_ACTOR").unwrap_or_else(|| DEFAULT_ACTOR.into());

        let aws_region = lookup("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.into());
        let bucket = lookup("SAGEMAKER_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.into());

        let output_s3_uri = lookup("SAGEMAKER_OUTPUT_S3_URI").unwrap_or_else(|| {
            format!("s3://{}/fits/{}/{}/", bucket, github_repo_name, github_ref_name)
        });
        validate_s3_uri("output_s3_uri", &output_s3_uri)?;

        let s3_http_url = format!(
            "https://{}.s3.amazonaws.com/fits/{}/{}/{}/",
            bucket, github_repo_name, github_ref_name, short_sha
        );
        validate_https_url("s3_http_url", &s3_http_url)?;

        let cloudwatch_logs = cloudwatch_logs_url(&aws_region, &short_sha);
        validate_https_url("cloudwatch_logs", &cloudwatch_logs)?;

        let ecr_repository =
            lookup("SAGEMAKER_ECR_REPOSITORY").unwrap_or_else(|| DEFAULT_ECR_REPOSITORY.into());
        let ecr_image = lookup("SAGEMAKER_ECR_IMAGE").or_else(|| {
            lookup("AWS_ACCOUNT_ID").map(|account| {
                format!(
                    "{}.dkr.ecr.{}.amazonaws.com/{}:{}",
                    account, aws_region, ecr_repository, github_repo_name
                )
            })
        });

        Ok(Self {
            github_ref_name,
            github_sha,
            short_sha,
            github_repository,
            github_repo_name,
            github_actor,
            github_token: lookup("GITHUB_TOKEN"),
            aws_region,
            bucket,
            output_s3_uri,
            s3_http_url,
            ecr_image,
            iam_role: lookup("SAGEMAKER_IAM_ROLE"),
            cloudwatch_logs,
            wandb_api_key: lookup("WANDB_API_KEY"),
            wandb_entity: lookup("WANDB_ENTITY"),
        })
    }

    /// Name shared by the training job, model, endpoint config and endpoint
    pub fn job_name(&self) -> &str {
        &self.short_sha
    }

    /// S3 location of the packaged training/inference source bundle
    pub fn source_bundle_uri(&self) -> String {
        format!(
            "{}{}/source/sourcedir.tar.gz",
            with_trailing_slash(&self.output_s3_uri),
            self.short_sha
        )
    }

    pub fn require_iam_role(&self) -> Result<&str, DomainError> {
        self.iam_role.as_deref().ok_or_else(|| {
            DomainError::configuration("SAGEMAKER_IAM_ROLE must be set to submit jobs")
        })
    }

    pub fn require_ecr_image(&self) -> Result<&str, DomainError> {
        self.ecr_image.as_deref().ok_or_else(|| {
            DomainError::configuration(
                "SAGEMAKER_ECR_IMAGE or AWS_ACCOUNT_ID must be set to resolve the training image",
            )
        })
    }
}

pub fn short_sha(sha: &str) -> String {
    sha.chars().take(SHORT_SHA_LENGTH).collect()
}

fn repo_name(repository: &str) -> Result<String, DomainError> {
    repository
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            DomainError::configuration(format!(
                "GITHUB_REPOSITORY '{}' has no repository name",
                repository
            ))
        })
}

fn cloudwatch_logs_url(region: &str, short_sha: &str) -> String {
    format!(
        "https://{region}.console.aws.amazon.com/cloudwatch/home?region={region}#logsV2:log-groups/log-group/$252Faws$252Fsagemaker$252FTrainingJobs$3FlogStreamNameFilter$3D{short_sha}"
    )
}

fn with_trailing_slash(uri: &str) -> String {
    if uri.ends_with('/') {
        uri.to_string()
    } else {
        format!("{}/", uri)
    }
}

/// Validate that a value is an `s3://bucket[/key]` URI
pub fn validate_s3_uri(field: &str, value: &str) -> Result<(), DomainError> {
    if S3_URI_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(DomainError::configuration(format!(
            "{} must be an S3 URI of the form s3://bucket/prefix, got '{}'",
            field, value
        )))
    }
}

fn validate_https_url(field: &str, value: &str) -> Result<(), DomainError> {
    if HTTPS_URL_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(DomainError::configuration(format!(
            "{} must be an https URL, got '{}'",
            field, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ci_env() -> HashMap<String, String> {
        env(&[
            ("GITHUB_REF_NAME", "feature-x"),
            ("EVENT_SHA", "abc1234def5678"),
            ("GITHUB_REPOSITORY", "octo/mnist-sagemaker-ci-cd"),
            ("GITHUB_ACTOR", "octocat"),
            ("GITHUB_TOKEN", "ghs_secret"),
            ("SAGEMAKER_IAM_ROLE", "arn:aws:iam::123456789012:role/sm"),
            ("AWS_ACCOUNT_ID", "123456789012"),
            ("WANDB_API_KEY", "wandb-secret"),
        ])
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve(&env(&[])).unwrap();

        assert_eq!(settings.github_ref_name, "main");
        assert_eq!(settings.short_sha, "0000000");
        assert_eq!(settings.github_repo_name, "mnist-sagemaker-ci-cd");
        assert_eq!(
            settings.output_s3_uri,
            "s3://with-context-sagemaker/fits/mnist-sagemaker-ci-cd/main/"
        );
        assert!(settings.iam_role.is_none());
        assert!(settings.ecr_image.is_none());
    }

    #[test]
    fn test_resolve_from_ci_env() {
        let settings = Settings::resolve(&ci_env()).unwrap();

        assert_eq!(settings.short_sha, "abc1234");
        assert_eq!(settings.job_name(), "abc1234");
        assert_eq!(settings.github_actor, "octocat");
        assert_eq!(
            settings.s3_http_url,
            "https://with-context-sagemaker.s3.amazonaws.com/fits/mnist-sagemaker-ci-cd/feature-x/abc1234/"
        );
        assert_eq!(
            settings.ecr_image.as_deref(),
            Some("123456789012.dkr.ecr.us-east-1.amazonaws.com/with-context-sagemaker-container:mnist-sagemaker-ci-cd")
        );
        assert!(settings.cloudwatch_logs.ends_with("logStreamNameFilter$3Dabc1234"));
        assert_eq!(
            settings.source_bundle_uri(),
            "s3://with-context-sagemaker/fits/mnist-sagemaker-ci-cd/feature-x/abc1234/source/sourcedir.tar.gz"
        );
    }

    #[test]
    fn test_event_sha_takes_precedence() {
        let settings = Settings::resolve(&env(&[
            ("EVENT_SHA", "1111111aaaa"),
            ("GITHUB_SHA", "2222222bbbb"),
        ]))
        .unwrap();
        assert_eq!(settings.short_sha, "1111111");

        let settings = Settings::resolve(&env(&[("GITHUB_SHA", "2222222bbbb")])).unwrap();
        assert_eq!(settings.short_sha, "2222222");
    }

    #[test]
    fn test_empty_values_fall_back() {
        let settings = Settings::resolve(&env(&[("GITHUB_REF_NAME", "  ")])).unwrap();
        assert_eq!(settings.github_ref_name, "main");
    }

    #[test]
    fn test_output_uri_override_must_be_s3() {
        let result = Settings::resolve(&env(&[(
            "SAGEMAKER_OUTPUT_S3_URI",
            "with-context-sagemaker/fits/",
        )]));
        assert!(matches!(result, Err(DomainError::Configuration { .. })));

        let result = Settings::resolve(&env(&[("SAGEMAKER_OUTPUT_S3_URI", "s3://")]));
        assert!(result.is_err());

        let settings = Settings::resolve(&env(&[(
            "SAGEMAKER_OUTPUT_S3_URI",
            "s3://other-bucket/runs",
        )]))
        .unwrap();
        assert_eq!(settings.output_s3_uri, "s3://other-bucket/runs");
        assert!(settings
            .source_bundle_uri()
            .starts_with("s3://other-bucket/runs/0000000/"));
    }

    #[test]
    fn test_invalid_bucket_fails_fast() {
        let result = Settings::resolve(&env(&[("SAGEMAKER_BUCKET", "Bad Bucket")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_derived_uris_always_have_scheme() {
        for (branch, repo) in [
            ("main", "a/b"),
            ("release-1.2", "org/some.repo"),
            ("dependabot", "x/y-z"),
        ] {
            let settings = Settings::resolve(&env(&[
                ("GITHUB_REF_NAME", branch),
                ("GITHUB_REPOSITORY", repo),
            ]))
            .unwrap();
            assert!(settings.output_s3_uri.starts_with("s3://"));
            assert!(settings.s3_http_url.starts_with("https://"));
            assert!(settings.cloudwatch_logs.starts_with("https://"));
        }
    }

    #[test]
    fn test_repository_without_name_fails() {
        let result = Settings::resolve(&env(&[("GITHUB_REPOSITORY", "octo/")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialization_omits_secrets() {
        let settings = Settings::resolve(&ci_env()).unwrap();
        let json = serde_json::to_string(&settings).unwrap();

        assert!(json.contains("\"short_sha\":\"abc1234\""));
        assert!(!json.contains("ghs_secret"));
        assert!(!json.contains("wandb-secret"));
    }

    #[test]
    fn test_required_values() {
        let settings = Settings::resolve(&env(&[])).unwrap();
        assert!(settings.require_iam_role().is_err());
        assert!(settings.require_ecr_image().is_err());

        let settings = Settings::resolve(&ci_env()).unwrap();
        assert_eq!(
            settings.require_iam_role().unwrap(),
            "arn:aws:iam::123456789012:role/sm"
        );
    }

    #[test]
    fn test_short_sha_is_deterministic() {
        assert_eq!(short_sha("abc1234ffff"), short_sha("abc1234ffff"));
        assert_eq!(short_sha("abc"), "abc");
    }
}
