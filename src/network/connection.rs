//! Connection - Handles an individual client connection.
//!
//! Each Connection runs in its own Tokio task:
//!
//! ```text
//!    ┌──────────────────────────────────────────────┐
//!    │             Connection Task                  │
//!    │                                              │
//!    │  [WebSocket read] ──▶ decode ──▶ [Handlers]  │
//!    │                                      │       │
//!    │  [WebSocket write] ◀── outbox ◀── fan-out    │
//!    │                                              │
//!    │  [heartbeat timer] ──▶ ping / timeout        │
//!    └──────────────────────────────────────────────┘
//! ```
//!
//! The socket is owned by this task alone. Other connections reach it only
//! through the bounded outbox registered in the [`Hub`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use duet_proto::{Inbound, ServerEvent, decode_frame, encode_frame};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, interval_at, timeout};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, info, instrument, warn};

use crate::error::RelayError;
use crate::handlers::{Context, Registry};
use crate::state::{ConnectionId, Evicted, Hub};

/// Upper bound on the closing handshake once the loop has ended.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Removes the connection from the hub when the task ends, however it ends.
struct DisconnectGuard {
    hub: Arc<Hub>,
    id: ConnectionId,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if self.hub.disconnect(self.id) {
            info!(id = %self.id, "Client disconnected");
        }
    }
}

/// How the run loop ended.
enum Shutdown {
    /// Flush a close handshake, optionally carrying a status first.
    Close(Option<CloseFrame<'static>>),
    /// A write was abandoned partway, so the stream can no longer carry a
    /// close frame. The socket is just dropped.
    Abandon,
}

/// A client connection handler.
pub struct Connection<S> {
    id: ConnectionId,
    addr: SocketAddr,
    ws: WebSocketStream<S>,
    hub: Arc<Hub>,
    handlers: Arc<Registry>,
    outbox_rx: mpsc::Receiver<Arc<ServerEvent>>,
    evicted: Evicted,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Register a connection whose WebSocket handshake has completed.
    pub fn accept(
        ws: WebSocketStream<S>,
        addr: SocketAddr,
        hub: Arc<Hub>,
        handlers: Arc<Registry>,
    ) -> Self {
        let (outbox, outbox_rx) = mpsc::channel(hub.config.limits.outbound_queue);
        let (id, evicted) = hub.connect(outbox);
        Self {
            id,
            addr,
            ws,
            hub,
            handlers,
            outbox_rx,
            evicted,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Run the connection until the client leaves, the transport fails, or
    /// the connection is evicted.
    #[instrument(skip(self), fields(id = %self.id), name = "connection")]
    pub async fn run(self) -> Result<(), RelayError> {
        let Self {
            id,
            addr,
            ws,
            hub,
            handlers,
            mut outbox_rx,
            mut evicted,
        } = self;

        let _guard = DisconnectGuard {
            hub: Arc::clone(&hub),
            id,
        };
        info!("Client connected");

        let max_frame_bytes = hub.config.limits.max_frame_bytes;
        let heartbeat = hub.config.heartbeat.schedule();
        let mut ping_timer =
            heartbeat.map(|(interval, _)| interval_at(Instant::now() + interval, interval));
        let mut last_seen = Instant::now();

        let ctx = Context {
            id,
            hub: &hub,
            remote_addr: addr,
        };
        let (mut sink, mut stream) = ws.split();

        let shutdown = loop {
            tokio::select! {
                frame = stream.next() => {
                    let frame = match frame {
                        Some(Ok(frame)) => frame,
                        None | Some(Err(WsError::ConnectionClosed)) => {
                            debug!("Transport closed");
                            break Shutdown::Close(None);
                        }
                        Some(Err(WsError::Capacity(e))) => {
                            // The reader stops mid-frame, so the stream cannot resync.
                            crate::metrics::record_malformed("frame_too_large");
                            warn!(error = %e, limit = max_frame_bytes, "Inbound frame over limit, closing");
                            break Shutdown::Close(Some(CloseFrame {
                                code: CloseCode::Size,
                                reason: "frame too large".into(),
                            }));
                        }
                        Some(Err(e)) => return Err(e.into()),
                    };
                    last_seen = Instant::now();

                    match decode_frame(frame, max_frame_bytes) {
                        Ok(Inbound::Event(event)) => {
                            // Failures are counted and logged by the registry.
                            let _ = handlers.dispatch(&ctx, event);
                        }
                        Ok(Inbound::Control) => {}
                        Ok(Inbound::Close) => {
                            debug!("Client sent close");
                            break Shutdown::Close(None);
                        }
                        Err(e) => {
                            crate::metrics::record_malformed(e.error_code());
                            let err = RelayError::from(e);
                            warn!(error = %err, "Dropped inbound frame");
                        }
                    }
                }

                _ = &mut evicted => {
                    info!("Connection evicted");
                    break Shutdown::Close(None);
                }

                event = outbox_rx.recv() => {
                    let Some(event) = event else {
                        info!("Connection evicted");
                        break Shutdown::Close(None);
                    };
                    if !send_unless_evicted(&mut sink, encode_frame(&event)?, &mut evicted).await? {
                        info!("Connection evicted while writing");
                        break Shutdown::Abandon;
                    }
                }

                _ = next_tick(&mut ping_timer) => {
                    if let Some((_, cutoff)) = heartbeat
                        && last_seen.elapsed() > cutoff
                    {
                        info!("Heartbeat timeout");
                        break Shutdown::Close(None);
                    }
                    if !send_unless_evicted(&mut sink, WsMessage::Ping(Vec::new()), &mut evicted).await? {
                        info!("Connection evicted while writing");
                        break Shutdown::Abandon;
                    }
                }
            }
        };

        if let Shutdown::Close(frame) = shutdown {
            let goodbye = async {
                if let Some(frame) = frame {
                    let _ = sink.send(WsMessage::Close(Some(frame))).await;
                }
                // Sends a bare close unless one is already queued.
                let _ = sink.close().await;
            };
            if timeout(CLOSE_TIMEOUT, goodbye).await.is_err() {
                debug!("Close handshake timed out");
            }
        }
        Ok(())
    }
}

/// Write one frame, giving up if the connection is evicted meanwhile.
///
/// Returns `Ok(false)` when the write was abandoned. A peer that stops
/// reading leaves the write pending forever otherwise.
async fn send_unless_evicted<K>(
    sink: &mut K,
    frame: WsMessage,
    evicted: &mut Evicted,
) -> Result<bool, RelayError>
where
    K: Sink<WsMessage, Error = WsError> + Unpin,
{
    tokio::select! {
        sent = sink.send(frame) => {
            sent?;
            Ok(true)
        }
        _ = evicted => Ok(false),
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
