//! Inbound event handlers.
//!
//! This module contains the [`Handler`] trait and the [`Registry`] that
//! dispatches decoded client events to it.

mod join;
mod midi;
mod registry;

pub use join::JoinHandler;
pub use midi::MidiHandler;
pub use registry::Registry;

pub use crate::error::{HandlerError, HandlerResult};

use crate::state::{ConnectionId, Hub};
use duet_proto::ClientEvent;
use std::net::SocketAddr;

/// Handler context passed to each event handler.
pub struct Context<'a> {
    /// The connection that sent the event.
    pub id: ConnectionId,
    /// Shared relay state.
    pub hub: &'a Hub,
    /// Remote address of the client.
    pub remote_addr: SocketAddr,
}

/// An inbound event handler.
///
/// Handlers never await: every side effect is a registry update or a
/// `try_send` into a bounded queue.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &Context<'_>, event: ClientEvent) -> HandlerResult;
}
