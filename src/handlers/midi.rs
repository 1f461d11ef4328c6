//! `midi` handler.

use super::{Context, Handler, HandlerError, HandlerResult};
use crate::state::ConnectionState;
use duet_proto::ClientEvent;

/// Relays MIDI to every other connection.
pub struct MidiHandler {
    require_join: bool,
}

impl MidiHandler {
    pub fn new(require_join: bool) -> Self {
        Self { require_join }
    }
}

impl Handler for MidiHandler {
    fn handle(&self, ctx: &Context<'_>, event: ClientEvent) -> HandlerResult {
        let ClientEvent::Midi(midi) = event else {
            return Err(HandlerError::UnexpectedEvent {
                expected: "midi",
                actual: event.name(),
            });
        };

        if self.require_join
            && ctx.hub.registry.state(ctx.id) != Some(ConnectionState::Identified)
        {
            return Err(HandlerError::NotJoined);
        }

        ctx.hub.relay_midi(ctx.id, midi);
        Ok(())
    }
}
