//! Queue and frame limits configuration.

use serde::Deserialize;

/// Queue and frame limits configuration.
///
/// These limits keep one slow or abusive client from exhausting server
/// memory or delaying everyone else.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Per-connection outbound queue capacity in events (default: 256).
    /// A recipient whose queue is full when a relay arrives is disconnected.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Largest accepted inbound message in bytes (default: 16384).
    /// The transport refuses a larger frame from its header and the
    /// connection is closed with status 1009.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Longest accepted display name in characters (default: 64).
    #[serde(default = "default_max_username_len")]
    pub max_username_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            outbound_queue: default_outbound_queue(),
            max_frame_bytes: default_max_frame_bytes(),
            max_username_len: default_max_username_len(),
        }
    }
}

fn default_outbound_queue() -> usize {
    256
}

fn default_max_frame_bytes() -> usize {
    16 * 1024
}

fn default_max_username_len() -> usize {
    64
}
