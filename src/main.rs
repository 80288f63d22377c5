//! TTL Store server binary
//!
//! # Startup Sequence
//! 1. Initialize tracing subscriber for logging
//! 2. Load configuration from environment variables
//! 3. Open the snapshot file and restore the previous snapshot
//! 4. Start the TTL sweep and snapshot tasks
//! 5. Serve the line protocol on the configured port
//! 6. On SIGINT/SIGTERM stop the tasks, write a final snapshot, release the file

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_store::{server, Config, Deleter, Dumper, StorageService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TTL Store");

    let config = Config::from_env();
    info!(
        ttl_check_interval = config.ttl_check_interval,
        dump_interval = config.dump_interval,
        dump_file = %config.dump_file.display(),
        port = config.server_port,
        buckets = config.bucket_count,
        "Configuration loaded"
    );

    let storage = StorageService::open(&config.dump_file, config.bucket_count)
        .with_context(|| format!("opening snapshot file {}", config.dump_file.display()))?;
    let restored = storage.load().context("loading snapshot")?;
    info!(entries = restored, "Store initialized");
    let storage = Arc::new(storage);

    let deleter = Deleter::start(Arc::clone(&storage), config.ttl_check_period());
    let dumper = Dumper::start(Arc::clone(&storage), config.dump_period());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    server::serve(listener, Arc::clone(&storage), shutdown_signal()).await?;

    deleter.shutdown().await;
    dumper.shutdown().await;

    let final_dump = {
        let storage = Arc::clone(&storage);
        tokio::task::spawn_blocking(move || storage.dump()).await
    };
    match final_dump {
        Ok(Ok(())) => info!("Final snapshot written"),
        Ok(Err(err)) => warn!(error = %err, "Final snapshot failed"),
        Err(err) => warn!(error = %err, "Final snapshot task failed"),
    }
    storage.stop();

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
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
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
