//! Event types exchanged between browser clients and the relay.
//!
//! Both directions use an adjacently tagged envelope:
//!
//! ```json
//! {"event": "midi", "data": {"message": [144, 60, 100], "timestamp": 1042.5}}
//! ```
//!
//! The older client emitted `user:join` and `midi:message`; those names are
//! accepted as aliases on input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// Field name the relay uses to tag the sender of a MIDI event.
///
/// Clients may not set it themselves; it is stripped on input.
pub const SENDER_FIELD: &str = "username";

/// An event sent from a client to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Attach a display name to this connection.
    #[serde(rename = "join", alias = "user:join")]
    Join(JoinRequest),
    /// A MIDI message to forward to every other connection.
    #[serde(rename = "midi", alias = "midi:message")]
    Midi(MidiMessage),
}

impl ClientEvent {
    /// Event name used as the dispatch key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Midi(_) => "midi",
        }
    }

    /// Check required fields and drop anything the client is not allowed to set.
    pub fn validated(self) -> Result<Self, ProtocolError> {
        match self {
            Self::Join(join) => {
                if join.username.trim().is_empty() {
                    return Err(ProtocolError::EmptyUsername);
                }
                Ok(Self::Join(join))
            }
            Self::Midi(mut midi) => {
                if midi.is_empty() {
                    return Err(ProtocolError::EmptyMessage);
                }
                midi.extra.remove(SENDER_FIELD);
                Ok(Self::Midi(midi))
            }
        }
    }
}

/// Payload of a `join` event.
///
/// Accepts both `{"username": "Alice"}` and the bare string `"Alice"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "JoinWire")]
pub struct JoinRequest {
    /// Requested display name. Not required to be unique.
    pub username: String,
}

impl JoinRequest {
    /// Create a join request for the given display name.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JoinWire {
    Named { username: String },
    Bare(String),
}

impl From<JoinWire> for JoinRequest {
    fn from(wire: JoinWire) -> Self {
        match wire {
            JoinWire::Named { username } | JoinWire::Bare(username) => Self { username },
        }
    }
}

/// Payload of a `midi` event.
///
/// `message` is opaque to the relay. Status and data bytes, a structured
/// object, anything non-empty is forwarded as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiMessage {
    /// The MIDI message itself, usually `[status, data1, data2]`.
    #[serde(default)]
    pub message: Value,
    /// Origin timestamp, carried through without conversion. Usually a
    /// number, but any JSON value the client sends is kept as is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    /// Any other fields the client attached.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MidiMessage {
    /// Wrap an opaque message with no timestamp or extra fields.
    pub fn new(message: Value) -> Self {
        Self {
            message,
            timestamp: None,
            extra: Map::new(),
        }
    }

    /// Build a message from raw MIDI bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()))
    }

    /// True when there is nothing to relay.
    pub fn is_empty(&self) -> bool {
        match &self.message {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            Value::String(s) => s.is_empty(),
            Value::Object(fields) => fields.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

/// An event sent from the relay to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Full list of identified users. Replaces whatever the client held.
    Presence(Vec<PresenceEntry>),
    /// A MIDI message played by another connection.
    Midi(RelayedMidi),
}

impl ServerEvent {
    /// Event name, for logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Presence(_) => "presence",
            Self::Midi(_) => "midi",
        }
    }
}

/// One user in a presence announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    /// Display name given on join.
    pub username: String,
    /// Milliseconds since the Unix epoch of the last join.
    pub last_active: i64,
}

/// A MIDI message as forwarded to peers, tagged with the sender's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedMidi {
    /// The message exactly as the sender submitted it.
    #[serde(flatten)]
    pub midi: MidiMessage,
    /// Sender display name; absent when the sender never joined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
