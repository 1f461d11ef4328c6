//! # duet-proto
//!
//! Wire protocol for the duet collaborative piano relay.
//!
//! Every WebSocket frame carries exactly one event. Text frames hold a JSON
//! envelope of the form `{"event": <name>, "data": <payload>}`; binary frames
//! hold raw MIDI bytes and are read as a `midi` event.
//!
//! ## Quick Start
//!
//! ```rust
//! use duet_proto::{ClientEvent, decode_text};
//!
//! let event = decode_text(r#"{"event":"join","data":{"username":"Alice"}}"#).unwrap();
//! assert!(matches!(event, ClientEvent::Join(ref join) if join.username == "Alice"));
//! ```
//!
//! The MIDI payload is opaque: the relay never looks inside `message`, it
//! only requires that it is present and non-empty.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
#[cfg(feature = "websocket")]
pub mod frame;

pub use error::ProtocolError;
pub use event::{ClientEvent, JoinRequest, MidiMessage, PresenceEntry, RelayedMidi, ServerEvent};
#[cfg(feature = "websocket")]
pub use frame::{Inbound, decode_frame, encode_frame};

/// Decode a text frame payload into a validated [`ClientEvent`].
pub fn decode_text(text: &str) -> Result<ClientEvent, ProtocolError> {
    let event: ClientEvent = serde_json::from_str(text)?;
    event.validated()
}

/// Encode a server event as the JSON text carried by one frame.
pub fn encode_text(event: &ServerEvent) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}
