//! Telemetry utilities for event timing and handshake spans.

use std::time::Instant;

/// Guard for timing event handling and recording metrics.
///
/// Records event latency when dropped.
pub struct EventTimer {
    event: &'static str,
    start: Instant,
}

impl EventTimer {
    /// Start timing an event.
    pub fn new(event: &'static str) -> Self {
        Self {
            event,
            start: Instant::now(),
        }
    }
}

impl Drop for EventTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_event(self.event, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use std::net::SocketAddr;
    use tracing::{Span, info_span};

    /// Create a span for an accepted TCP stream. The `connection` span of
    /// the task nests inside it once the upgrade succeeds.
    pub fn handshake(addr: &SocketAddr) -> Span {
        info_span!("handshake", addr = %addr)
    }
}
