//! Eviction requests.
//!
//! Fan-out code runs inside whichever connection task produced the event, so
//! it cannot tear down a failing recipient itself. It files a request here
//! and the disconnect worker removes the recipient from the registry.

use tokio::sync::mpsc;
use tracing::warn;

use super::ConnectionId;
use crate::error::RelayError;

/// Capacity of the disconnect request queue.
pub const DISCONNECT_QUEUE: usize = 1024;

/// A request to evict one connection.
#[derive(Debug)]
pub struct DisconnectRequest {
    pub id: ConnectionId,
    pub cause: RelayError,
}

/// Handle used to request evictions without blocking.
#[derive(Clone)]
pub struct LifecycleManager {
    disconnect_tx: mpsc::Sender<DisconnectRequest>,
}

impl LifecycleManager {
    pub fn new(disconnect_tx: mpsc::Sender<DisconnectRequest>) -> Self {
        Self { disconnect_tx }
    }

    /// Create a manager together with the receiving end for the worker.
    pub fn channel() -> (Self, mpsc::Receiver<DisconnectRequest>) {
        let (tx, rx) = mpsc::channel(DISCONNECT_QUEUE);
        (Self::new(tx), rx)
    }

    /// Ask the disconnect worker to evict `id`.
    ///
    /// Never blocks. A full queue drops the request; the recipient's task
    /// still tears itself down when its transport fails.
    pub fn request_disconnect(&self, id: ConnectionId, cause: RelayError) {
        if let Err(e) = self
            .disconnect_tx
            .try_send(DisconnectRequest { id, cause })
        {
            warn!(id = %id, error = %e, "Disconnect request dropped");
        }
    }
}
