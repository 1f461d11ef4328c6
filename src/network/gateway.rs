//! Gateway - TCP listener that accepts incoming WebSocket connections.
//!
//! The Gateway binds a socket, performs the WebSocket handshake (enforcing
//! the origin allow-list) and spawns a Connection task for each client.

use crate::config::{LimitsConfig, ListenConfig};
use crate::handlers::Registry;
use crate::network::Connection;
use crate::state::Hub;
use crate::telemetry::spans;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{Instrument, debug, error, info, instrument, warn};

/// The Gateway accepts incoming TCP connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    hub: Arc<Hub>,
    handlers: Arc<Registry>,
}

impl Gateway {
    /// Bind the gateway to the configured listen address.
    pub async fn bind(hub: Arc<Hub>, handlers: Arc<Registry>) -> anyhow::Result<Self> {
        let addr = hub.config.listen.address;
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "WebSocket listener bound");
        Ok(Self {
            listener,
            hub,
            handlers,
        })
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(%addr, error = %e, "Failed to set TCP_NODELAY");
                    }
                    let hub = Arc::clone(&self.hub);
                    let handlers = Arc::clone(&self.handlers);
                    tokio::spawn(
                        serve_client(stream, addr, hub, handlers).instrument(spans::handshake(&addr)),
                    );
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

async fn serve_client(stream: TcpStream, addr: SocketAddr, hub: Arc<Hub>, handlers: Arc<Registry>) {
    let listen = hub.config.listen.clone();
    let origin_check = |req: &Request, response: Response| check_origin(&listen, req, response);

    let config = websocket_config(&hub.config.limits);

    let ws = match accept_hdr_async_with_config(stream, origin_check, Some(config)).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(error = %e, "WebSocket handshake failed");
            return;
        }
    };

    let connection = Connection::accept(ws, addr, hub, handlers);
    let id = connection.id();
    match connection.run().await {
        Ok(()) => {}
        Err(e) if e.is_fatal() => {
            warn!(%id, error = %e, code = e.error_code(), "Connection ended with error");
        }
        Err(e) => debug!(%id, error = %e, "Connection ended"),
    }
}

/// Transport limits for accepted sockets.
///
/// A single message or frame may not exceed `max_frame_bytes`, so the reader
/// refuses an oversized frame from its header instead of buffering it.
pub(super) fn websocket_config(limits: &LimitsConfig) -> WebSocketConfig {
    WebSocketConfig {
        max_message_size: Some(limits.max_frame_bytes),
        max_frame_size: Some(limits.max_frame_bytes),
        ..WebSocketConfig::default()
    }
}

/// Handshake callback: accept the upgrade only from allowed origins.
fn check_origin(
    listen: &ListenConfig,
    req: &Request,
    response: Response,
) -> Result<Response, ErrorResponse> {
    let origin = req.headers().get("Origin").and_then(|o| o.to_str().ok());
    if listen.origin_allowed(origin) {
        return Ok(response);
    }

    warn!(origin = origin.unwrap_or("<none>"), "WebSocket origin rejected");
    let mut rejection = ErrorResponse::new(Some("origin not allowed".to_string()));
    *rejection.status_mut() = StatusCode::FORBIDDEN;
    Err(rejection)
}
