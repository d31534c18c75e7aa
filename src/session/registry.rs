//! Session registry: slot id → session, and every lifecycle operation on it.
//!
//! All methods are total: unknown slots and stale callbacks are logged at debug
//! level and otherwise ignored. Nothing here returns an error to the caller.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::EngineConfig;
use crate::domain::settings::{FeedKind, SettingsChange, SettingsPatch, SlotSettings, UserAction};
use crate::error::{HostError, HttpError};
use crate::host::Host;
use crate::session::backfill::{spawn_backfill, HistorySource};
use crate::session::feed::FeedTask;
use crate::session::{ConnectionId, EngineEvent, FeedEvent, FeedEventKind, Generation, Session};
use crate::shared::SlotId;
use crate::ws::{ConnectionState, FeedProvider, StreamDescriptor};

const LOADING: &str = "Loading…";
const REFRESHING: &str = "Refreshing…";

/// Owns every live session. Only the engine task touches it.
pub struct SessionRegistry {
    sessions: HashMap<SlotId, Session>,
    ctx: Context,
}

/// Collaborators and counters shared by all sessions.
struct Context {
    config: EngineConfig,
    provider: Arc<dyn FeedProvider>,
    history: Arc<dyn HistorySource>,
    host: Arc<dyn Host>,
    events: mpsc::UnboundedSender<EngineEvent>,
    /// Registry-wide, so a re-created session never reuses a predecessor's value.
    last_generation: Generation,
    last_connection: u64,
}

impl SessionRegistry {
    pub(crate) fn new(
        config: EngineConfig,
        provider: Arc<dyn FeedProvider>,
        history: Arc<dyn HistorySource>,
        host: Arc<dyn Host>,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            ctx: Context {
                config,
                provider,
                history,
                host,
                events,
                last_generation: 0,
                last_connection: 0,
            },
        }
    }

    pub fn get(&self, slot: &SlotId) -> Option<&Session> {
        self.sessions.get(slot)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn slots(&self) -> impl Iterator<Item = &SlotId> {
        self.sessions.keys()
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Create the session for `slot`, replacing (and fully tearing down) any existing one.
    pub fn start(&mut self, slot: SlotId, kind: FeedKind, settings: SlotSettings) {
        if let Some(mut old) = self.sessions.remove(&slot) {
            tracing::debug!(slot = %slot, generation = old.generation, "Replacing session");
            old.teardown();
        }

        let generation = self.ctx.next_generation();
        let mut session = Session::new(slot.clone(), kind, settings, generation);
        tracing::info!(
            slot = %slot,
            generation,
            symbol = %session.settings.symbol,
            kind = %kind,
            "Starting session"
        );

        let title = format!("{}\n{}", session.settings.symbol, LOADING);
        self.ctx.placeholder(&mut session, &title);
        if kind.uses_window() {
            self.ctx.backfill(&mut session);
        }
        self.ctx.connect(&mut session);
        self.sessions.insert(slot, session);
    }

    /// Merge a partial settings object into the live session.
    pub fn update_config(&mut self, slot: &SlotId, patch: &SettingsPatch) {
        let Some(session) = self.sessions.get(slot) else {
            tracing::debug!(slot = %slot, "Settings for unknown slot");
            return;
        };
        let next = session.settings.merged(patch);
        self.apply_settings(slot, next);
    }

    /// Reconnect with the current settings, re-running the backfill.
    pub fn manual_refresh(&mut self, slot: &SlotId) {
        let Some(session) = self.sessions.get_mut(slot) else {
            tracing::debug!(slot = %slot, "Refresh for unknown slot");
            return;
        };
        tracing::info!(slot = %slot, "Manual refresh");
        self.ctx.placeholder(session, REFRESHING);
        self.ctx.reconnect(session, true);
        log_host(slot, self.ctx.host.show_ok(slot));
    }

    /// Destroy the session. No-op for unknown slots.
    pub fn stop(&mut self, slot: &SlotId) {
        match self.sessions.remove(slot) {
            Some(mut session) => {
                tracing::info!(slot = %slot, generation = session.generation, "Stopping session");
                session.teardown();
            }
            None => tracing::debug!(slot = %slot, "Stop for unknown slot"),
        }
    }

    /// Tear down every session.
    pub fn shutdown(&mut self) {
        for (_, mut session) in self.sessions.drain() {
            session.teardown();
        }
    }

    /// A message from the settings UI: persist the merged settings, then apply them.
    pub fn on_user_action(&mut self, slot: &SlotId, action: UserAction) {
        let Some(session) = self.sessions.get(slot) else {
            tracing::debug!(slot = %slot, "User action for unknown slot");
            return;
        };
        let next = session.settings.merged(&action.into_patch());
        log_host(slot, self.ctx.host.set_settings(slot, next.persisted(session.kind)));
        self.apply_settings(slot, next);
    }

    fn apply_settings(&mut self, slot: &SlotId, next: SlotSettings) {
        let Some(session) = self.sessions.get_mut(slot) else {
            return;
        };
        match session.settings.classify(&next, session.kind) {
            SettingsChange::Unchanged => {
                tracing::debug!(slot = %slot, "Settings unchanged");
            }
            SettingsChange::Cosmetic => {
                tracing::debug!(slot = %slot, "Cosmetic settings change, redrawing");
                session.settings = next;
                self.ctx.push(session);
            }
            SettingsChange::Stream => {
                let kind = session.kind;
                self.start(slot.clone(), kind, next);
            }
        }
    }

    // ── Async callbacks ──────────────────────────────────────────────────

    pub fn on_feed_event(&mut self, event: FeedEvent) {
        let Some(session) = self.sessions.get_mut(&event.slot) else {
            tracing::debug!(slot = %event.slot, connection = %event.connection, "Feed event for unknown slot");
            return;
        };
        if event.generation != session.generation {
            tracing::debug!(
                slot = %event.slot,
                generation = event.generation,
                current = session.generation,
                "Dropping stale feed event"
            );
            return;
        }

        match event.kind {
            FeedEventKind::Opened => {
                if let Some(conn) = session.connections.iter_mut().find(|c| c.id == event.connection) {
                    conn.set_state(ConnectionState::Open);
                }
                tracing::info!(slot = %event.slot, stream = %event.stream, "Stream open");
            }
            FeedEventKind::Message(text) => match session.apply_message(event.stream, &text) {
                Ok(true) => self.ctx.push(session),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(slot = %event.slot, stream = %event.stream, "Dropping message: {}", e);
                }
            },
            FeedEventKind::Error(e) => {
                tracing::warn!(slot = %event.slot, stream = %event.stream, "Stream error: {}", e);
            }
            FeedEventKind::Closed { code, reason } => {
                if let Some(pos) = session.connections.iter().position(|c| c.id == event.connection) {
                    let mut conn = session.connections.remove(pos);
                    conn.set_state(ConnectionState::Closed);
                }
                tracing::info!(
                    slot = %event.slot,
                    stream = %event.stream,
                    code = ?code,
                    reason = %reason,
                    "Stream closed"
                );
                self.ctx.schedule_reconnect(session);
            }
        }
    }

    pub fn on_reconnect_due(&mut self, slot: &SlotId, generation: Generation) {
        let Some(session) = self.sessions.get_mut(slot) else {
            tracing::debug!(slot = %slot, "Reconnect for unknown slot");
            return;
        };
        if session.generation != generation {
            tracing::debug!(slot = %slot, generation, "Dropping stale reconnect");
            return;
        }
        // The timer has fired; nothing left to abort.
        session.reconnect = None;
        tracing::info!(slot = %slot, "Reconnecting");
        self.ctx.reconnect(session, false);
    }

    pub fn on_backfill_done(
        &mut self,
        slot: &SlotId,
        generation: Generation,
        result: Result<Vec<f64>, HttpError>,
    ) {
        let Some(session) = self.sessions.get_mut(slot) else {
            tracing::debug!(slot = %slot, "Backfill for unknown slot");
            return;
        };
        if session.backfill_generation != Some(generation) {
            tracing::debug!(slot = %slot, generation, "Dropping stale backfill");
            return;
        }
        session.backfill_generation = None;
        session.backfill = None;

        match result {
            Ok(closes) => {
                tracing::info!(slot = %slot, samples = closes.len(), "Backfill complete");
                session.apply_backfill(closes);
                self.ctx.push(session);
            }
            Err(e) => tracing::warn!(slot = %slot, "Backfill failed: {}", e),
        }
    }
}

impl Context {
    fn next_generation(&mut self) -> Generation {
        self.last_generation += 1;
        self.last_generation
    }

    /// Open every stream of the session under its current generation.
    fn connect(&mut self, session: &mut Session) {
        for stream in session.streams() {
            self.last_connection += 1;
            let task = FeedTask {
                provider: Arc::clone(&self.provider),
                descriptor: StreamDescriptor::new(session.settings.symbol.clone(), stream),
                slot: session.slot.clone(),
                generation: session.generation,
                connection: ConnectionId(self.last_connection),
                heartbeat: self.config.heartbeat_interval,
                connect_timeout: self.config.connect_timeout,
                events: self.events.clone(),
            };
            session.connections.push(task.spawn());
        }
    }

    /// Close the current connections and open fresh ones under a new generation.
    fn reconnect(&mut self, session: &mut Session, with_backfill: bool) {
        if let Some(timer) = session.reconnect.take() {
            timer.abort();
        }
        for conn in &mut session.connections {
            conn.request_close();
        }
        session.connections.clear();

        session.generation = self.next_generation();
        self.connect(session);
        if with_backfill && session.kind.uses_window() {
            self.backfill(session);
        }
    }

    fn backfill(&self, session: &mut Session) {
        if let Some(task) = session.backfill.take() {
            task.abort();
        }
        session.backfill_generation = Some(session.generation);
        session.backfill = Some(spawn_backfill(
            Arc::clone(&self.history),
            session.slot.clone(),
            session.generation,
            session.settings.symbol.clone(),
            session.settings.chart_range.preset(),
            self.events.clone(),
        ));
    }

    /// Arm the reconnect timer unless one is already pending.
    fn schedule_reconnect(&self, session: &mut Session) {
        if session.reconnect.is_some() {
            tracing::debug!(slot = %session.slot, "Reconnect already pending");
            return;
        }
        let delay = self.config.reconnect_delay;
        let events = self.events.clone();
        let slot = session.slot.clone();
        let generation = session.generation;
        tracing::info!(slot = %slot, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
        session.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(EngineEvent::ReconnectDue { slot, generation });
        }));
    }

    fn placeholder(&self, session: &mut Session, title: &str) {
        log_host(&session.slot, self.host.set_title(&session.slot, title));
        session.title_pending = true;
    }

    /// Render and send the session's image, clearing any placeholder title.
    fn push(&self, session: &mut Session) {
        let artifact = session.render();
        tracing::debug!(slot = %session.slot, "{}", artifact.summary);
        log_host(&session.slot, self.host.set_image(&session.slot, artifact));
        if session.title_pending {
            log_host(&session.slot, self.host.set_title(&session.slot, ""));
            session.title_pending = false;
        }
    }
}

fn log_host(slot: &SlotId, result: Result<(), HostError>) {
    if let Err(e) = result {
        tracing::warn!(slot = %slot, "Host command failed: {}", e);
    }
}
