//! WebSocket listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// WebSocket listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (default: "0.0.0.0:3000").
    #[serde(default = "default_listen_address")]
    pub address: SocketAddr,
    /// Allowed origins for the WebSocket handshake (e.g., `["http://localhost:5173"]`).
    /// Empty list allows all origins.
    #[serde(default)]
    pub allow_origins: Vec<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
            allow_origins: Vec::new(),
        }
    }
}

impl ListenConfig {
    /// Whether a handshake carrying `origin` may proceed.
    ///
    /// Requests without an Origin header (non-browser clients) are only
    /// accepted when no allow-list is configured.
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        if self.allow_origins.is_empty() {
            return true;
        }
        origin.is_some_and(|origin| self.allow_origins.iter().any(|a| a == origin || a == "*"))
    }
}

fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}
