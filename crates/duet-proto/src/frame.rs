//! WebSocket frame codec.
//!
//! Maps tungstenite frames to [`ClientEvent`]s and [`ServerEvent`]s to text
//! frames. Control frames are surfaced as [`Inbound::Control`] so the caller
//! can count them as liveness without treating them as events.

use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::error::ProtocolError;
use crate::event::{ClientEvent, MidiMessage, ServerEvent};

/// Result of reading one frame from a client.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A validated client event.
    Event(ClientEvent),
    /// Ping, pong, or a raw continuation frame. Nothing to dispatch.
    Control,
    /// The peer started the closing handshake.
    Close,
}

/// Decode a single frame, rejecting payloads larger than `max_len` bytes.
///
/// Binary frames are raw MIDI bytes and become a `midi` event.
pub fn decode_frame(frame: WsMessage, max_len: usize) -> Result<Inbound, ProtocolError> {
    let len = frame.len();
    if len > max_len {
        return Err(ProtocolError::FrameTooLarge {
            actual: len,
            limit: max_len,
        });
    }

    match frame {
        WsMessage::Text(text) => crate::decode_text(&text).map(Inbound::Event),
        WsMessage::Binary(bytes) => ClientEvent::Midi(MidiMessage::from_bytes(&bytes))
            .validated()
            .map(Inbound::Event),
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => Ok(Inbound::Control),
        WsMessage::Close(_) => Ok(Inbound::Close),
    }
}

/// Encode a server event as a text frame.
pub fn encode_frame(event: &ServerEvent) -> Result<WsMessage, ProtocolError> {
    crate::encode_text(event).map(WsMessage::Text)
}
