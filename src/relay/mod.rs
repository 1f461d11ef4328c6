//! Outbound fan-out: MIDI relay and presence announcements.
//!
//! Both paths queue one shared `Arc<ServerEvent>` per recipient with
//! `try_send`. A recipient whose queue is full or closed is handed to the
//! [`LifecycleManager`] for eviction and the loop moves on.

mod fanout;
mod presence;

pub use fanout::MessageRelay;
pub use presence::PresenceBroadcaster;

use std::sync::Arc;

use duet_proto::ServerEvent;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::RelayError;
use crate::state::{ConnectionId, LifecycleManager, Outbox};

/// Delivery counts for one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayOutcome {
    pub delivered: usize,
    pub failed: usize,
}

pub(crate) fn deliver(
    targets: Vec<(ConnectionId, Outbox)>,
    event: &Arc<ServerEvent>,
    lifecycle: &LifecycleManager,
) -> RelayOutcome {
    let mut outcome = RelayOutcome::default();
    for (id, outbox) in targets {
        match outbox.try_send(Arc::clone(event)) {
            Ok(()) => outcome.delivered += 1,
            Err(err) => {
                outcome.failed += 1;
                let cause = match err {
                    TrySendError::Full(_) => RelayError::SendBackpressure(id),
                    TrySendError::Closed(_) => RelayError::Transport("outbound queue closed".into()),
                };
                lifecycle.request_disconnect(id, cause);
            }
        }
    }
    outcome
}
