//! MIDI fan-out to every other connection.

use std::sync::Arc;

use duet_proto::{MidiMessage, RelayedMidi, ServerEvent};
use tracing::debug;

use super::{RelayOutcome, deliver};
use crate::state::{ConnectionId, ConnectionRegistry, LifecycleManager};

/// Forwards MIDI from one connection to all others.
pub struct MessageRelay {
    registry: Arc<ConnectionRegistry>,
    lifecycle: LifecycleManager,
}

impl MessageRelay {
    pub fn new(registry: Arc<ConnectionRegistry>, lifecycle: LifecycleManager) -> Self {
        Self {
            registry,
            lifecycle,
        }
    }

    /// Queue `midi` for every connection except `sender`.
    ///
    /// The sender's current display name is attached; an unidentified
    /// sender relays without one. Never blocks on a recipient.
    pub fn relay(&self, sender: ConnectionId, midi: MidiMessage) -> RelayOutcome {
        let event = Arc::new(ServerEvent::Midi(RelayedMidi {
            midi,
            username: self.registry.display_name(sender),
        }));

        let targets = self.registry.broadcast_targets(sender);
        let outcome = deliver(targets, &event, &self.lifecycle);
        crate::metrics::record_fanout(outcome.delivered);

        if outcome.failed > 0 {
            debug!(
                id = %sender,
                delivered = outcome.delivered,
                failed = outcome.failed,
                "MIDI relay had failing recipients"
            );
        }
        outcome
    }
}
