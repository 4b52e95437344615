//! SageMaker CI/CD
//!
//! Trains a model on SageMaker for every commit, deploys the resulting
//! artifact to an endpoint named after the commit and serves predictions
//! from it over HTTP.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{AppConfig, Settings};
