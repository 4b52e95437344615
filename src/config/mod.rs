//! Configuration: application config file/env layers and CI settings

mod app_config;
pub mod settings;

pub use app_config::{
    AppConfig, InferenceConfig, LogFormat, LoggingConfig, PipelineConfig, ServerConfig,
};
pub use settings::{EnvSource, ProcessEnv, Settings};
