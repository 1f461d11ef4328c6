//! Error types for the duet wire protocol.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors produced while decoding or encoding a single frame.
///
/// None of these are fatal to a connection: a frame that fails to decode is
/// dropped and the connection keeps reading.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The frame was not a valid JSON envelope or did not match any event.
    #[error("invalid event json: {0}")]
    Json(#[from] serde_json::Error),

    /// A `join` event carried an empty (or whitespace-only) username.
    #[error("join event has an empty username")]
    EmptyUsername,

    /// A `midi` event carried no payload, or an empty one.
    #[error("midi event has an empty message")]
    EmptyMessage,

    /// The frame exceeded the configured size limit.
    #[error("frame too large: {actual} bytes (limit {limit})")]
    FrameTooLarge {
        /// Size of the offending frame.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },
}

impl ProtocolError {
    /// Static error code for metric labels.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Json(_) => "invalid_json",
            Self::EmptyUsername => "empty_username",
            Self::EmptyMessage => "empty_message",
            Self::FrameTooLarge { .. } => "frame_too_large",
        }
    }
}
