//! Service entry point.

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use service::{Config, ServiceError};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics exporter
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(config.metrics_addr)
        .install()
        .map_err(|err| ServiceError::Metrics(err.to_string()))?;
    tracing::info!(addr = %config.metrics_addr, "metrics exporter listening");

    // 3. Connect backends and build services
    let app = service::build_app(&config).await?;

    // 4. Run snapshot triggers until shutdown
    let shutdown = CancellationToken::new();
    let snapshots = app.snapshots.clone();
    let token = shutdown.clone();
    let snapshot_task = tokio::spawn(async move { snapshots.run(token).await });

    tracing::info!(
        triggers = app.snapshots.trigger_count().await,
        "configuration store running"
    );

    shutdown_signal().await;
    shutdown.cancel();
    snapshot_task.await?;

    tracing::info!("service shut down gracefully");
    Ok(())
}
