//! Event handler registry and dispatch.

use super::{Context, Handler, HandlerError, HandlerResult, JoinHandler, MidiHandler};
use crate::config::Config;
use crate::telemetry::EventTimer;
use duet_proto::ClientEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Level, debug, span};

/// Registry of event handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
    /// Per-event usage counters.
    event_counts: HashMap<&'static str, AtomicU64>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new(config: &Config) -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        handlers.insert(
            "join",
            Box::new(JoinHandler::new(config.limits.max_username_len)),
        );
        handlers.insert("midi", Box::new(MidiHandler::new(config.relay.require_join)));

        let event_counts = handlers
            .keys()
            .map(|&name| (name, AtomicU64::new(0)))
            .collect();

        Self {
            handlers,
            event_counts,
        }
    }

    /// Usage statistics, most used first.
    pub fn event_stats(&self) -> Vec<(&'static str, u64)> {
        let mut stats: Vec<_> = self
            .event_counts
            .iter()
            .map(|(name, count)| (*name, count.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1));
        stats
    }

    /// Dispatch an event to its handler.
    pub fn dispatch(&self, ctx: &Context<'_>, event: ClientEvent) -> HandlerResult {
        let name = event.name();
        let Some(handler) = self.handlers.get(name) else {
            return Err(HandlerError::UnknownEvent(name));
        };
        if let Some(count) = self.event_counts.get(name) {
            count.fetch_add(1, Ordering::Relaxed);
        }

        let _span = span!(
            Level::DEBUG,
            "event",
            event = name,
            id = %ctx.id,
            remote_addr = %ctx.remote_addr,
        )
        .entered();
        let _timer = EventTimer::new(name);

        let result = handler.handle(ctx, event);
        if let Err(ref e) = result {
            crate::metrics::record_event_error(name, e.error_code());
            debug!(event = name, error = %e, "Event error");
        }
        result
    }
}
