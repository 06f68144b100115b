#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use pwhash::Service;
use server::config::{CliArgs, ServerConfig};
use server::http::app;
use server::telemetry::init_telemetry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry()?;

    let listener = TcpListener::bind(config.server_addr).await?;
    log_startup_info(&config);

    let service = Arc::new(Service::new(config.service.clone()));

    // Resolves only once the listener is closed and every connection has
    // finished.
    axum::serve(listener, app(Arc::clone(&service)))
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&service)))
        .await?;

    tracing::info!("Listener stopped");

    let pending = service.worker().pending();
    if pending > 0 {
        tracing::info!("Waiting for {pending} digest(s) still in progress");
    }
    let left = service.worker().drain_timeout(config.shutdown_timeout).await;
    if left > 0 {
        tracing::warn!(
            "Gave up on {left} digest(s) after {:?}",
            config.shutdown_timeout
        );
    }

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting digest service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            "Starting digest service on {} (delay {:?})",
            config.server_addr,
            config.service.hash_delay
        );
    }
}

/// Resolves when the listener should close.
///
/// That is the gate's shutdown-ready signal, fired once a `/shutdown` request
/// was accepted and every request admitted before it has completed. Ctrl+C and
/// SIGTERM initiate the same drain.
async fn shutdown_signal(service: Arc<Service>) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let gate = service.gate();

    tokio::select! {
        () = gate.wait_ready() => {},
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
            gate.initiate_shutdown();
            gate.wait_ready().await;
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
            gate.initiate_shutdown();
            gate.wait_ready().await;
        },
    }

    tracing::info!("Drain complete, closing listener");
}
