//! Shared relay state.
//!
//! The `Hub` ties the registry to the two fan-out paths and owns the
//! connect, join and disconnect transitions. One `Arc<Hub>` is shared by
//! the gateway, every connection task and the disconnect worker.

use std::sync::Arc;

use duet_proto::MidiMessage;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{
    ConnectionId, ConnectionRegistry, DisconnectRequest, Evicted, LifecycleManager, Outbox,
    UserPresence,
};
use crate::config::Config;
use crate::error::RelayError;
use crate::relay::{MessageRelay, PresenceBroadcaster, RelayOutcome};

pub struct Hub {
    pub registry: Arc<ConnectionRegistry>,
    pub relay: MessageRelay,
    pub presence: PresenceBroadcaster,
    pub config: Arc<Config>,
}

impl Hub {
    /// Build the hub and the receiver for its disconnect worker.
    pub fn new(config: Arc<Config>) -> (Self, mpsc::Receiver<DisconnectRequest>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let (lifecycle, disconnect_rx) = LifecycleManager::channel();
        let hub = Self {
            relay: MessageRelay::new(Arc::clone(&registry), lifecycle.clone()),
            presence: PresenceBroadcaster::new(Arc::clone(&registry), lifecycle),
            registry,
            config,
        };
        (hub, disconnect_rx)
    }

    /// Register a freshly accepted connection.
    pub fn connect(&self, outbox: Outbox) -> (ConnectionId, Evicted) {
        let (id, evicted) = self.registry.register(outbox);
        crate::metrics::set_connected_clients(self.registry.len());
        (id, evicted)
    }

    /// Identify `id` and announce the new presence list.
    pub fn join(&self, id: ConnectionId, username: &str) -> Result<UserPresence, RelayError> {
        let presence = self.registry.identify(id, username)?;
        info!(id = %presence.id, username = %presence.username, "User joined");
        self.presence.announce();
        Ok(presence)
    }

    pub fn relay_midi(&self, sender: ConnectionId, midi: MidiMessage) -> RelayOutcome {
        self.relay.relay(sender, midi)
    }

    /// Remove `id`. Only the call that actually removed it announces.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            crate::metrics::set_connected_clients(self.registry.len());
            self.presence.announce();
        }
        removed
    }
}

/// Drain eviction requests filed during fan-out.
///
/// Removing the entry drops the registry's queue handle and fires the
/// connection's [`Evicted`] signal, so its task shuts the socket even while
/// blocked writing to a peer that stopped reading.
pub fn spawn_disconnect_worker(
    hub: Arc<Hub>,
    mut rx: mpsc::Receiver<DisconnectRequest>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(DisconnectRequest { id, cause }) = rx.recv().await {
            crate::metrics::record_eviction(cause.error_code());
            if hub.disconnect(id) {
                info!(id = %id, cause = %cause, "Evicted connection");
            } else {
                debug!(id = %id, cause = %cause, "Eviction target already gone");
            }
        }
    })
}
