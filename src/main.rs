//! duetd - real-time MIDI relay for a browser-based collaborative piano.
//!
//! Accepts WebSocket clients, tracks who is connected, and forwards each
//! client's MIDI events to everyone else.

mod config;
mod error;
mod handlers;
mod http;
mod metrics;
mod network;
mod relay;
mod state;
mod telemetry;

use crate::config::{Config, LogFormat};
use crate::handlers::Registry;
use crate::network::Gateway;
use crate::state::{Hub, spawn_disconnect_worker};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration; no path means built-in defaults
    let mut config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)
            .map_err(|e| anyhow::anyhow!("failed to load config {path}: {e}"))?,
        None => Config::default(),
    };
    config.apply_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.server.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_span_list(true)
            .init(),
    }

    if let Err(errors) = crate::config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("configuration has {} error(s)", errors.len());
    }

    info!(
        server = %config.server.name,
        listen = %config.listen.address,
        require_join = config.relay.require_join,
        "Starting duetd"
    );

    metrics::init();
    if let Some(port) = config.server.metrics_port.filter(|p| *p != 0) {
        let listener = http::bind(port).await?;
        tokio::spawn(async move {
            if let Err(e) = http::serve(listener).await {
                error!(error = %e, "Metrics endpoint stopped");
            }
        });
    }

    let config = Arc::new(config);
    let handlers = Arc::new(Registry::new(&config));
    let (hub, disconnect_rx) = Hub::new(Arc::clone(&config));
    let hub = Arc::new(hub);
    spawn_disconnect_worker(Arc::clone(&hub), disconnect_rx);
    info!("Disconnect worker started");

    let gateway = Gateway::bind(Arc::clone(&hub), Arc::clone(&handlers)).await?;

    tokio::select! {
        result = gateway.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!(
                connections = hub.registry.len(),
                events = ?handlers.event_stats(),
                "Shutting down"
            );
        }
    }

    Ok(())
}
