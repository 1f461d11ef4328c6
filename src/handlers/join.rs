//! `join` handler.

use super::{Context, Handler, HandlerError, HandlerResult};
use duet_proto::ClientEvent;

/// Attaches a display name to the connection and announces presence.
pub struct JoinHandler {
    max_username_len: usize,
}

impl JoinHandler {
    pub fn new(max_username_len: usize) -> Self {
        Self { max_username_len }
    }
}

impl Handler for JoinHandler {
    fn handle(&self, ctx: &Context<'_>, event: ClientEvent) -> HandlerResult {
        let ClientEvent::Join(request) = event else {
            return Err(HandlerError::UnexpectedEvent {
                expected: "join",
                actual: event.name(),
            });
        };

        let username = request.username.trim();
        if username.chars().count() > self.max_username_len {
            return Err(HandlerError::InvalidUsername {
                limit: self.max_username_len,
            });
        }

        ctx.hub.join(ctx.id, username)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::{ConnectionState, Hub};
    use duet_proto::{JoinRequest, MidiMessage};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn setup() -> (Hub, crate::state::ConnectionId) {
        let (hub, _evictions) = Hub::new(Arc::new(Config::default()));
        let (tx, _rx) = mpsc::channel(8);
        let id = hub.connect(tx).0;
        (hub, id)
    }

    fn ctx(hub: &Hub, id: crate::state::ConnectionId) -> Context<'_> {
        Context {
            id,
            hub,
            remote_addr: "127.0.0.1:4000".parse().unwrap(),
        }
    }

    #[test]
    fn join_identifies_with_trimmed_name() {
        let (hub, id) = setup();
        JoinHandler::new(16)
            .handle(&ctx(&hub, id), ClientEvent::Join(JoinRequest::new("  Alice ")))
            .unwrap();
        assert_eq!(hub.registry.display_name(id).as_deref(), Some("Alice"));
        assert_eq!(hub.registry.state(id), Some(ConnectionState::Identified));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let (hub, id) = setup();
        let err = JoinHandler::new(4)
            .handle(&ctx(&hub, id), ClientEvent::Join(JoinRequest::new("Rosalind")))
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidUsername { limit: 4 }));
        assert_eq!(hub.registry.state(id), Some(ConnectionState::Unidentified));
    }

    #[test]
    fn wrong_event_is_rejected() {
        let (hub, id) = setup();
        let err = JoinHandler::new(4)
            .handle(
                &ctx(&hub, id),
                ClientEvent::Midi(MidiMessage::new(serde_json::json!([1]))),
            )
            .unwrap_err();
        assert_eq!(err.error_code(), "unexpected_event");
    }
}
