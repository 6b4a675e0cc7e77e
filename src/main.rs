//! kargo-slack-webhook - admission webhook for Kargo SlackMessage resources.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Loads configuration from the environment
//! - Starts the health server, the admission webhook and optionally the echo receiver

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::task::JoinError;
use tracing::{error, info};

use kargo_slack_webhook::{
    HealthState, InMemoryChannelClient, Validator, WebhookConfig, run_health_server,
    run_receiver_server, run_webhook_server,
};

/// Grace period for in-flight admission requests to complete during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kargo_slack_webhook=info".parse()?),
        )
        .json()
        .init();

    info!("Starting kargo-slack-webhook");

    let config = WebhookConfig::from_env()?;
    info!(
        webhook_port = config.webhook_port,
        health_port = config.health_port,
        receiver_port = ?config.receiver_port,
        validation_timeout = ?config.validation_timeout,
        "Loaded configuration"
    );

    let health_state = Arc::new(HealthState::new());

    let latency = config.provision_latency;
    let channels = Arc::new(InMemoryChannelClient::new().with_latency(latency));
    let validator = Validator::new(channels)
        .with_timeout(config.validation_timeout)
        .with_health_state(health_state.clone());

    // Start health server immediately so liveness probes pass during startup
    let health_handle = tokio::spawn(run_health_server(health_state.clone(), config.health_port));

    let webhook_handle = {
        let health_state = health_state.clone();
        let config = config.clone();
        tokio::spawn(async move {
            run_webhook_server(validator, &config, Some(health_state)).await
        })
    };

    let receiver_handle = config
        .receiver_port
        .map(|port| tokio::spawn(run_receiver_server(port)));
    if receiver_handle.is_none() {
        info!("RECEIVER_PORT not set, webhook receiver disabled");
    }

    // Wait for any task to complete (or fail), or shutdown signal
    tokio::select! {
        result = webhook_handle => server_exit("Webhook server", result)?,
        result = health_handle => server_exit("Health server", result)?,
        result = async {
            match receiver_handle {
                Some(handle) => handle.await,
                None => std::future::pending().await,
            }
        } => server_exit("Webhook receiver", result)?,
        // Handle graceful shutdown on SIGTERM or SIGINT
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Mark as not ready so the API server stops routing admission requests here
            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");

            info!(
                "Waiting {}s for in-flight admission requests to complete...",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;

            info!("Grace period complete, shutting down");
        }
    }

    info!("Webhook stopped");
    Ok(())
}

/// Map a finished server task onto the process result.
///
/// A server that fails to bind or crashes makes the process exit non-zero.
fn server_exit<E>(
    name: &str,
    result: Result<Result<(), E>, JoinError>,
) -> Result<(), Box<dyn std::error::Error>>
where
    E: std::error::Error + 'static,
{
    match result {
        Ok(Ok(())) => {
            info!("{} stopped", name);
            Ok(())
        }
        Ok(Err(e)) => {
            error!("{} error: {}", name, e);
            Err(Box::new(e))
        }
        Err(e) => {
            error!("{} task panicked: {}", name, e);
            Err(Box::new(e))
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the process cannot shut down
/// gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
