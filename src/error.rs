//! Unified error handling for duet.
//!
//! This module provides the relay's error taxonomy. None of these errors are
//! fatal to the process; each is scoped to a single connection or event.

use crate::state::ConnectionId;
use duet_proto::ProtocolError;
use thiserror::Error;

// ============================================================================
// Relay Errors (registry, fan-out, transport)
// ============================================================================

/// Errors raised while relaying events between connections.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The connection was already removed from the registry.
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    /// A recipient's outbound queue is full.
    #[error("outbound queue full for {0}")]
    SendBackpressure(ConnectionId),

    /// Read or write failure on a connection's transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The event could not be decoded. The connection stays open.
    #[error("malformed event: {0}")]
    MalformedEvent(#[from] ProtocolError),
}

impl RelayError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownConnection(_) => "unknown_connection",
            Self::SendBackpressure(_) => "send_backpressure",
            Self::Transport(_) => "transport_error",
            Self::MalformedEvent(_) => "malformed_event",
        }
    }

    /// Whether the connection that raised this error must be torn down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SendBackpressure(_) | Self::Transport(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RelayError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

// ============================================================================
// Handler Errors (event processing)
// ============================================================================

/// Errors that can occur during event handling.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("midi from a connection that has not joined")]
    NotJoined,

    #[error("username longer than {limit} characters")]
    InvalidUsername { limit: usize },

    #[error("no handler registered for event: {0}")]
    UnknownEvent(&'static str),

    #[error("handler for {expected} received a {actual} event")]
    UnexpectedEvent {
        expected: &'static str,
        actual: &'static str,
    },
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Relay(e) => e.error_code(),
            Self::NotJoined => "not_joined",
            Self::InvalidUsername { .. } => "invalid_username",
            Self::UnknownEvent(_) => "unknown_event",
            Self::UnexpectedEvent { .. } => "unexpected_event",
        }
    }
}

/// Result type for event handlers.
pub type HandlerResult = Result<(), HandlerError>;
