//! Connection registry.
//!
//! The single source of truth for who is connected. Every open WebSocket has
//! one entry from acceptance until teardown; identified entries also carry a
//! [`UserPresence`].
//!
//! Entries live in a `DashMap`, so each operation holds at most one shard
//! lock and never across I/O. Callers get cloned queue handles back and do
//! their `try_send` after the guard is gone.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use duet_proto::ServerEvent;
use tokio::sync::{mpsc, oneshot};

use super::{ConnectionId, ConnectionIdGenerator, UserPresence};
use crate::error::RelayError;

/// Sending half of a connection's outbound queue.
pub type Outbox = mpsc::Sender<Arc<ServerEvent>>;

/// Resolves once the connection's entry has been removed from the registry.
///
/// Nothing is ever sent on it; removal drops the sending half, which
/// completes the receiver with an error.
pub type Evicted = oneshot::Receiver<()>;

/// Identification state of a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unidentified,
    Identified,
}

struct ConnectionEntry {
    outbox: Outbox,
    _evict: oneshot::Sender<()>,
    presence: Option<UserPresence>,
    /// Order of first identification. Survives re-joins.
    seq: Option<u64>,
}

/// Registry of live connections.
pub struct ConnectionRegistry {
    entries: DashMap<ConnectionId, ConnectionEntry>,
    ids: ConnectionIdGenerator,
    join_seq: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            ids: ConnectionIdGenerator::new(),
            join_seq: AtomicU64::new(0),
        }
    }

    /// Store a new unidentified connection.
    ///
    /// Returns its id and a signal that fires when the entry is removed, so
    /// the owning task can abandon a write stuck on a peer that stopped
    /// reading.
    pub fn register(&self, outbox: Outbox) -> (ConnectionId, Evicted) {
        let id = self.ids.next();
        let (evict, evicted) = oneshot::channel();
        self.entries.insert(
            id,
            ConnectionEntry {
                outbox,
                _evict: evict,
                presence: None,
                seq: None,
            },
        );
        (id, evicted)
    }

    /// Attach (or overwrite) the display name of `id`.
    ///
    /// A re-join refreshes name and timestamp but keeps the connection's
    /// original place in the presence order.
    pub fn identify(&self, id: ConnectionId, username: &str) -> Result<UserPresence, RelayError> {
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or(RelayError::UnknownConnection(id))?;

        if entry.seq.is_none() {
            entry.seq = Some(self.join_seq.fetch_add(1, Ordering::Relaxed));
        }
        let presence = UserPresence::new(id, username);
        entry.presence = Some(presence.clone());
        Ok(presence)
    }

    /// Delete `id`. Returns `true` only for the call that removed it.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Presence of every identified connection, in order of first join.
    pub fn snapshot(&self) -> Vec<UserPresence> {
        let mut identified: Vec<(u64, UserPresence)> = self
            .entries
            .iter()
            .filter_map(|e| match (e.seq, &e.presence) {
                (Some(seq), Some(p)) => Some((seq, p.clone())),
                _ => None,
            })
            .collect();
        identified.sort_unstable_by_key(|(seq, _)| *seq);
        identified.into_iter().map(|(_, p)| p).collect()
    }

    /// Queue handles of every connection except `exclude`.
    pub fn broadcast_targets(&self, exclude: ConnectionId) -> Vec<(ConnectionId, Outbox)> {
        self.entries
            .iter()
            .filter(|e| *e.key() != exclude)
            .map(|e| (*e.key(), e.outbox.clone()))
            .collect()
    }

    /// Queue handles of every connection.
    pub fn all_targets(&self) -> Vec<(ConnectionId, Outbox)> {
        self.entries
            .iter()
            .map(|e| (*e.key(), e.outbox.clone()))
            .collect()
    }

    /// Display name of `id`, if it has joined.
    pub fn display_name(&self, id: ConnectionId) -> Option<String> {
        self.entries
            .get(&id)
            .and_then(|e| e.presence.as_ref().map(|p| p.username.clone()))
    }

    pub fn state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.entries.get(&id).map(|e| {
            if e.presence.is_some() {
                ConnectionState::Identified
            } else {
                ConnectionState::Unidentified
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
