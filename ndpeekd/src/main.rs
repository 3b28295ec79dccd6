mod api;
mod config;
mod display;
mod ingest;
mod listener;
mod ndp;
mod stats;
mod stats_manager;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use crate::config::Config;
use crate::stats::NdpStats;

/// Bounded so a flood of ICMPv6 applies backpressure to the listener thread
const DATAGRAM_QUEUE: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // Config first: it decides where logs go
    let config_arg = std::env::args().nth(1);
    let (config, config_path) = Config::load_or_default(config_arg.as_deref())?;

    init_tracing(config.log_file().as_deref())?;

    tracing::info!("Starting ndpeekd");
    match &config_path {
        Some(path) => tracing::info!("Loaded config from {}", path.display()),
        None => tracing::info!("No config file found, using defaults"),
    }

    let stats = Arc::new(NdpStats::new(config.stats.window()));
    tracing::info!("Retention window: {}s", config.stats.window_secs);

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    // Spawn listener on a blocking thread
    let (datagram_tx, datagram_rx) = flume::bounded(DATAGRAM_QUEUE);
    let listener_cancel = cancel.clone();
    let listener_config = config.listener.clone();
    let listener_handle = tokio::task::spawn_blocking(move || {
        if let Err(e) = listener::run_listener(listener_config, datagram_tx, listener_cancel.clone()) {
            tracing::error!("Listener error: {:#}", e);
            // Nothing left to observe without a packet source
            listener_cancel.cancel();
        }
    });

    // Spawn stats manager task
    let mgr_cancel = cancel.clone();
    let mgr_config = config.stats.clone();
    let mgr_stats = stats.clone();
    let mgr_handle = tokio::spawn(async move {
        if let Err(e) = stats_manager::run(mgr_stats, datagram_rx, mgr_config, mgr_cancel).await {
            tracing::error!("Stats manager error: {}", e);
        }
    });

    // Spawn display task
    let display_handle = if config.display.enabled {
        let display_cancel = cancel.clone();
        let display_config = config.display.clone();
        let display_stats = stats.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = display::run(display_stats, display_config, display_cancel).await {
                tracing::error!("Display error: {}", e);
            }
        }))
    } else {
        None
    };

    // Bind HTTP server
    let server_handle = if config.api.enabled {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to read hostname: {}", e);
                "unknown".to_string()
            });
        let app = api::routes::router(api::routes::AppState {
            stats: stats.clone(),
            interface: config.listener.interface.clone(),
            hostname,
        });

        let listener = tokio::net::TcpListener::bind(config.api.listen)
            .await
            .with_context(|| format!("Failed to bind to {}", config.api.listen))?;
        tracing::info!("API listening on {}", config.api.listen);

        let server_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_cancel.cancelled().await })
                .await
            {
                tracing::error!("Server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Wait for shutdown signal, a quit key, or the listener giving up
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for ctrl-c")?;
            tracing::info!("Shutdown signal received");
        }
        _ = cancel.cancelled() => {
            tracing::info!("Shutdown requested");
        }
    }

    cancel.cancel();

    let _ = tokio::join!(
        listener_handle,
        mgr_handle,
        async {
            if let Some(handle) = display_handle {
                let _ = handle.await;
            }
        },
        async {
            if let Some(handle) = server_handle {
                let _ = handle.await;
            }
        },
    );

    tracing::info!(
        "Shutdown complete ({} peers, {} routers tracked)",
        stats.peer_count(),
        stats.router_count()
    );
    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ndpeekd=info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
