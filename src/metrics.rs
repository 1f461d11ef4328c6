//! Prometheus metrics collection for duet.
//!
//! Metrics are exposed on an HTTP endpoint when `server.metrics_port` is set.
//!
//! - `duet_connected_clients` - Open WebSocket connections (gauge)
//! - `duet_identified_users` - Connections that have joined (gauge)
//! - `duet_events_total{event}` - Inbound events processed by type
//! - `duet_event_duration_seconds{event}` - Event handling latency histogram
//! - `duet_midi_fanout` - Recipients per relayed MIDI message (histogram)
//! - `duet_evictions_total{cause}` - Connections evicted by the relay

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Presence snapshots pushed to all clients.
pub static PRESENCE_ANNOUNCEMENTS: OnceLock<IntCounter> = OnceLock::new();

/// Inbound frames that failed to decode.
pub static MALFORMED_EVENTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Connections evicted by fan-out, by cause.
pub static EVICTIONS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Currently open connections.
pub static CONNECTED_CLIENTS: OnceLock<IntGauge> = OnceLock::new();

/// Connections that have sent `join`.
pub static IDENTIFIED_USERS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Event metrics
// ========================================================================

/// Events processed by type (join, midi).
pub static EVENT_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Event processing latency by type.
pub static EVENT_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Event errors by type and error kind.
pub static EVENT_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Recipients per relayed MIDI message.
pub static MIDI_FANOUT: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at server startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(PRESENCE_ANNOUNCEMENTS, IntCounter::new("duet_presence_announcements_total", "Presence snapshots broadcast"));
    register!(MALFORMED_EVENTS, IntCounterVec::new(Opts::new("duet_malformed_events_total", "Inbound frames that failed to decode"), &["error"]));
    register!(EVICTIONS, IntCounterVec::new(Opts::new("duet_evictions_total", "Connections evicted during fan-out"), &["cause"]));
    register!(CONNECTED_CLIENTS, IntGauge::new("duet_connected_clients", "Open WebSocket connections"));
    register!(IDENTIFIED_USERS, IntGauge::new("duet_identified_users", "Connections that have joined"));

    register!(EVENT_COUNTER, IntCounterVec::new(Opts::new("duet_events_total", "Inbound events processed by type"), &["event"]));
    register!(EVENT_LATENCY, HistogramVec::new(
        HistogramOpts::new("duet_event_duration_seconds", "Event handling latency by type")
            .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05]),
        &["event"]));
    register!(EVENT_ERRORS, IntCounterVec::new(Opts::new("duet_event_errors_total", "Event errors by type"), &["event", "error"]));
    register!(MIDI_FANOUT, Histogram::with_opts(
        HistogramOpts::new("duet_midi_fanout", "Recipients per relayed MIDI message")
            .buckets(vec![0.0, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0])));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

/// Record an event execution with latency.
#[inline]
pub fn record_event(event: &str, duration_secs: f64) {
    if let Some(c) = EVENT_COUNTER.get() {
        c.with_label_values(&[event]).inc();
    }
    if let Some(h) = EVENT_LATENCY.get() {
        h.with_label_values(&[event]).observe(duration_secs);
    }
}

/// Record an event error.
#[inline]
pub fn record_event_error(event: &str, error: &str) {
    if let Some(c) = EVENT_ERRORS.get() {
        c.with_label_values(&[event, error]).inc();
    }
}

#[inline]
pub fn record_malformed(error: &str) {
    if let Some(c) = MALFORMED_EVENTS.get() {
        c.with_label_values(&[error]).inc();
    }
}

/// Record MIDI fan-out (how many recipients a message was queued for).
#[inline]
pub fn record_fanout(recipients: usize) {
    if let Some(h) = MIDI_FANOUT.get() {
        h.observe(recipients as f64);
    }
}

#[inline]
pub fn record_eviction(cause: &str) {
    if let Some(c) = EVICTIONS.get() {
        c.with_label_values(&[cause]).inc();
    }
}

#[inline]
pub fn record_presence_announcement() {
    if let Some(c) = PRESENCE_ANNOUNCEMENTS.get() {
        c.inc();
    }
}

#[inline]
pub fn set_connected_clients(count: usize) {
    if let Some(g) = CONNECTED_CLIENTS.get() {
        g.set(count as i64);
    }
}

#[inline]
pub fn set_identified_users(count: usize) {
    if let Some(g) = IDENTIFIED_USERS.get() {
        g.set(count as i64);
    }
}
