//! Serve command - runs the inference façade

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::bootstrap;
use crate::api::{create_router, AppState};
use crate::config::{AppConfig, Settings};
use crate::domain::inference::Predictor;
use crate::infrastructure::sagemaker::{load_aws_config, SageMakerClient, SageMakerRuntimeClient};

/// Run the façade until Ctrl+C or SIGTERM
pub async fn run() -> anyhow::Result<()> {
    let config = bootstrap()?;
    let settings = Settings::from_env()?;

    let endpoint_name = endpoint_name(&config, &settings);
    let aws_config = load_aws_config(&settings.aws_region).await;

    let predictor = Predictor::new(
        Arc::new(SageMakerRuntimeClient::new(&aws_config)),
        endpoint_name.clone(),
        config.inference.model.payload_mode(),
    );
    let state = AppState::new(predictor, Arc::new(SageMakerClient::new(&aws_config)));
    let app = create_router(state);

    let addr = build_socket_addr(&config)?;
    info!(
        endpoint_name = %endpoint_name,
        model = %config.inference.model,
        "Starting inference façade on {}",
        addr
    );

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Configured endpoint, else the one deployed for this commit
fn endpoint_name(config: &AppConfig, settings: &Settings) -> String {
    config
        .inference
        .endpoint_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| settings.job_name().to_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}
