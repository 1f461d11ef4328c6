//! State management module.
//!
//! Contains the connection registry, identity records and the [`Hub`] that
//! ties them to the relay.

mod hub;
mod lifecycle;
mod presence;
mod registry;
mod uid;

pub use hub::{Hub, spawn_disconnect_worker};
pub use lifecycle::{DisconnectRequest, LifecycleManager};
pub use presence::UserPresence;
pub use registry::{ConnectionRegistry, ConnectionState, Evicted, Outbox};
pub use uid::{ConnectionId, ConnectionIdGenerator};
