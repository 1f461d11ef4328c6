//! Presence snapshots pushed to every connection.

use std::sync::Arc;

use duet_proto::ServerEvent;
use parking_lot::Mutex;
use tracing::debug;

use super::{RelayOutcome, deliver};
use crate::state::{ConnectionRegistry, LifecycleManager};

/// Broadcasts the full list of identified users after each change.
pub struct PresenceBroadcaster {
    registry: Arc<ConnectionRegistry>,
    lifecycle: LifecycleManager,
    // Held from snapshot to last enqueue so an older list cannot land behind a newer one.
    order: Mutex<()>,
}

impl PresenceBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>, lifecycle: LifecycleManager) -> Self {
        Self {
            registry,
            lifecycle,
            order: Mutex::new(()),
        }
    }

    /// Send the current presence snapshot to every connection.
    pub fn announce(&self) -> RelayOutcome {
        let _order = self.order.lock();

        if self.registry.is_empty() {
            crate::metrics::set_identified_users(0);
            debug!("Presence unchanged for an empty room");
            return RelayOutcome::default();
        }

        let snapshot = self.registry.snapshot();
        let identified = snapshot.len();
        let event = Arc::new(ServerEvent::Presence(
            snapshot.iter().map(|p| p.to_entry()).collect(),
        ));

        let outcome = deliver(self.registry.all_targets(), &event, &self.lifecycle);

        crate::metrics::record_presence_announcement();
        crate::metrics::set_identified_users(identified);
        debug!(
            users = identified,
            delivered = outcome.delivered,
            failed = outcome.failed,
            "Presence announced"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn latest_names(rx: &mut mpsc::Receiver<Arc<ServerEvent>>) -> Option<Vec<String>> {
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            if let ServerEvent::Presence(list) = &*event {
                last = Some(list.iter().map(|e| e.username.clone()).collect());
            }
        }
        last
    }

    #[test]
    fn announce_reaches_unidentified_connections_too() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (lifecycle, _evictions) = LifecycleManager::channel();
        let presence = PresenceBroadcaster::new(Arc::clone(&registry), lifecycle);

        let (a_tx, mut a_rx) = mpsc::channel(8);
        let (b_tx, mut b_rx) = mpsc::channel(8);
        let alice = registry.register(a_tx).0;
        let _lurker = registry.register(b_tx).0;
        registry.identify(alice, "Alice").unwrap();

        let outcome = presence.announce();
        assert_eq!(outcome.delivered, 2);
        assert_eq!(latest_names(&mut a_rx), Some(vec!["Alice".to_string()]));
        assert_eq!(latest_names(&mut b_rx), Some(vec!["Alice".to_string()]));
    }

    #[test]
    fn empty_snapshot_is_still_sent() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (lifecycle, _evictions) = LifecycleManager::channel();
        let presence = PresenceBroadcaster::new(Arc::clone(&registry), lifecycle);

        let (tx, mut rx) = mpsc::channel(8);
        let _ = registry.register(tx);
        presence.announce();
        assert_eq!(latest_names(&mut rx), Some(vec![]));
    }

    #[test]
    fn last_leave_skips_announcement() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (lifecycle, _evictions) = LifecycleManager::channel();
        let presence = PresenceBroadcaster::new(Arc::clone(&registry), lifecycle);

        let (tx, mut rx) = mpsc::channel(8);
        let id = registry.register(tx).0;
        registry.identify(id, "Alice").unwrap();
        registry.remove(id);

        assert_eq!(presence.announce(), RelayOutcome::default());
        assert_eq!(latest_names(&mut rx), None);
    }

    #[tokio::test]
    async fn full_queue_requests_eviction() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (lifecycle, mut evictions) = LifecycleManager::channel();
        let presence = PresenceBroadcaster::new(Arc::clone(&registry), lifecycle);

        let (tx, _rx) = mpsc::channel(1);
        let id = registry.register(tx).0;
        presence.announce();
        presence.announce();

        let request = evictions.recv().await.unwrap();
        assert_eq!(request.id, id);
        assert!(matches!(
            request.cause,
            crate::error::RelayError::SendBackpressure(evicted) if evicted == id
        ));
    }
}
