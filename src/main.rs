//! Pump indexer worker binary.
//!
//! Entry point for the launchpad event indexer: migrates the schema,
//! spawns the holder reconciler, and drives the ingestion poll loop until
//! a termination signal arrives.

use std::sync::Arc;

use anyhow::Context as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pump_indexer::{reconcile, IndexerConfig, Worker, WorkerContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pump_indexer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = IndexerConfig::from_env().context("loading configuration")?;
    tracing::info!(
        network = %config.network,
        module = %config.module_addr,
        "starting pump indexer"
    );

    let ctx = Arc::new(
        WorkerContext::initialize(config)
            .await
            .context("initializing worker context")?,
    );

    tokio::spawn(reconcile::run_scheduler(Arc::clone(&ctx)));
    tokio::spawn(reconcile::run_worker(Arc::clone(&ctx)));

    let worker = Worker::new(Arc::clone(&ctx));

    tokio::select! {
        result = worker.run() => {
            result.context("ingestion loop aborted")?;
        }
        () = shutdown_signal() => {
            tracing::info!("shutdown signal received; exiting");
        }
    }

    ctx.shutdown().await;
    Ok(())
}

/// Resolves when the process receives SIGINT or SIGTERM. In-flight
/// transactions are left to the store's rollback-on-disconnect behavior.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
