//! Subscription tasks.
//!
//! Each live stream runs in its own task: open (bounded by the connect timeout),
//! forward frames to the engine, answer server pings, send a heartbeat ping on a
//! fixed interval, and report `Closed` exactly once when it ends for any reason.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::error::WsError;
use crate::session::{ConnectionHandle, ConnectionId, EngineEvent, FeedEvent, FeedEventKind, Generation};
use crate::shared::SlotId;
use crate::ws::{FeedConnection, FeedProvider, Frame, StreamDescriptor, StreamKind};

/// Everything a subscription task needs.
pub(crate) struct FeedTask {
    pub provider: Arc<dyn FeedProvider>,
    pub descriptor: StreamDescriptor,
    pub slot: SlotId,
    pub generation: Generation,
    pub connection: ConnectionId,
    pub heartbeat: Duration,
    pub connect_timeout: Duration,
    pub events: mpsc::UnboundedSender<EngineEvent>,
}

impl FeedTask {
    /// Spawn the task and return the registry's handle to it.
    pub(crate) fn spawn(self) -> ConnectionHandle {
        let (close_tx, close_rx) = oneshot::channel();
        let (id, stream, generation) = (self.connection, self.descriptor.kind, self.generation);
        let task = tokio::spawn(self.run(close_rx));
        ConnectionHandle::new(id, stream, generation, close_tx, task)
    }

    fn emit(&self, kind: FeedEventKind) {
        send_feed_event(
            &self.events,
            &self.slot,
            self.generation,
            self.connection,
            self.descriptor.kind,
            kind,
        );
    }

    async fn run(self, mut close_rx: oneshot::Receiver<()>) {
        let mut closed = ClosedReport {
            events: self.events.clone(),
            slot: self.slot.clone(),
            generation: self.generation,
            connection: self.connection,
            stream: self.descriptor.kind,
            sent: false,
        };

        // ── 1. Open ──────────────────────────────────────────────────────
        let opened = tokio::select! {
            _ = &mut close_rx => {
                closed.send(None, "Closed before open");
                return;
            }
            result = tokio::time::timeout(self.connect_timeout, self.provider.subscribe(&self.descriptor)) => {
                result.unwrap_or(Err(WsError::Timeout))
            }
        };

        let mut conn = match opened {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(
                    slot = %self.slot,
                    generation = self.generation,
                    stream = %self.descriptor,
                    "Subscription failed: {}",
                    e
                );
                self.emit(FeedEventKind::Error(e.to_string()));
                closed.send(None, e.to_string());
                return;
            }
        };

        self.emit(FeedEventKind::Opened);

        // ── 2. Connected loop ────────────────────────────────────────────
        let (code, reason) = self.run_connected(conn.as_mut(), &mut close_rx).await;
        closed.send(code, reason);
    }

    async fn run_connected(
        &self,
        conn: &mut dyn FeedConnection,
        close_rx: &mut oneshot::Receiver<()>,
    ) -> (Option<u16>, String) {
        let mut heartbeat = tokio::time::interval(self.heartbeat);
        heartbeat.reset(); // skip immediate first tick

        loop {
            tokio::select! {
                // ── a) Close requested by the registry ───────────────────
                _ = &mut *close_rx => {
                    if let Err(e) = conn.close().await {
                        tracing::debug!(stream = %self.descriptor, "Close failed: {}", e);
                    }
                    return (Some(1000), "Client disconnect".into());
                }

                // ── b) Incoming frame ────────────────────────────────────
                frame = conn.next_frame() => {
                    match frame {
                        Some(Ok(Frame::Text(text))) => self.emit(FeedEventKind::Message(text)),
                        Some(Ok(Frame::Ping(payload))) => {
                            if let Err(e) = conn.send_pong(payload).await {
                                tracing::warn!(stream = %self.descriptor, "Failed to send pong: {}", e);
                            }
                        }
                        Some(Ok(Frame::Pong(_))) => {
                            tracing::trace!(stream = %self.descriptor, "Received pong");
                        }
                        Some(Ok(Frame::Close { code, reason })) => return (code, reason),
                        Some(Err(e)) => {
                            tracing::warn!(stream = %self.descriptor, "WebSocket error: {}", e);
                            self.emit(FeedEventKind::Error(e.to_string()));
                            return (None, e.to_string());
                        }
                        None => return (None, "Stream ended".into()),
                    }
                }

                // ── c) Heartbeat ─────────────────────────────────────────
                _ = heartbeat.tick() => {
                    if let Err(e) = conn.send_ping(Vec::new()).await {
                        tracing::warn!(stream = %self.descriptor, "Failed to send ping: {}", e);
                    }
                }
            }
        }
    }
}

fn send_feed_event(
    events: &mpsc::UnboundedSender<EngineEvent>,
    slot: &SlotId,
    generation: Generation,
    connection: ConnectionId,
    stream: StreamKind,
    kind: FeedEventKind,
) {
    let event = EngineEvent::Feed(FeedEvent {
        slot: slot.clone(),
        generation,
        connection,
        stream,
        kind,
    });
    // The engine is gone; nothing left to report to.
    let _ = events.send(event);
}

/// The task's single `Closed` report. If the task unwinds or is dropped before
/// sending it, the drop sends it instead so the registry still reconnects.
struct ClosedReport {
    events: mpsc::UnboundedSender<EngineEvent>,
    slot: SlotId,
    generation: Generation,
    connection: ConnectionId,
    stream: StreamKind,
    sent: bool,
}

impl ClosedReport {
    fn send(&mut self, code: Option<u16>, reason: impl Into<String>) {
        if self.sent {
            return;
        }
        self.sent = true;
        send_feed_event(
            &self.events,
            &self.slot,
            self.generation,
            self.connection,
            self.stream,
            FeedEventKind::Closed {
                code,
                reason: reason.into(),
            },
        );
    }
}

impl Drop for ClosedReport {
    fn drop(&mut self) {
        if !self.sent {
            tracing::warn!(
                slot = %self.slot,
                generation = self.generation,
                stream = %self.stream,
                "Feed task ended without closing"
            );
            self.send(None, "Feed task ended unexpectedly");
        }
    }
}
