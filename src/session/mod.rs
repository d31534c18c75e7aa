//! Sessions: one per display slot.
//!
//! A [`Session`] owns everything a slot shows: settings, rolling window, latest
//! snapshot, and handles to the tasks feeding it. Sessions are only ever touched by
//! the [`engine::Engine`] task; connection, timer and backfill tasks talk to it by
//! posting [`EngineEvent`]s tagged with a [`Generation`].

pub mod backfill;
pub mod engine;
pub mod feed;
pub mod registry;

use crate::domain::depth::wire::WsPartialDepth;
use crate::domain::depth::DepthBook;
use crate::domain::settings::{FeedKind, SlotSettings};
use crate::domain::ticker::wire::{WsKlineEvent, WsTicker};
use crate::domain::ticker::{closed_price, TickerSnapshot};
use crate::domain::window::RollingWindow;
use crate::error::{HttpError, ParseError};
use crate::host::HostEvent;
use crate::render::{render_depth, render_ticker, Artifact, DepthView, TickerView};
use crate::shared::SlotId;
use crate::ws::{ConnectionState, StreamKind};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Monotonic (re)connect counter. Callbacks carrying an older value are stale.
pub type Generation = u64;

/// Identity of one spawned subscription task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// What happened on a subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEventKind {
    Opened,
    Message(String),
    Error(String),
    Closed { code: Option<u16>, reason: String },
}

/// A subscription event, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub slot: SlotId,
    pub generation: Generation,
    pub connection: ConnectionId,
    pub stream: StreamKind,
    pub kind: FeedEventKind,
}

/// Everything the engine reacts to.
#[derive(Debug)]
pub enum EngineEvent {
    Host(HostEvent),
    Feed(FeedEvent),
    ReconnectDue {
        slot: SlotId,
        generation: Generation,
    },
    BackfillDone {
        slot: SlotId,
        generation: Generation,
        result: Result<Vec<f64>, HttpError>,
    },
    /// The host went away; tear everything down and stop.
    Shutdown,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Latest market state of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Ticker(TickerSnapshot),
    Depth(DepthBook),
}

impl Snapshot {
    fn empty(kind: FeedKind) -> Self {
        match kind {
            FeedKind::TickerKline => Snapshot::Ticker(TickerSnapshot::default()),
            FeedKind::Depth => Snapshot::Depth(DepthBook::new()),
        }
    }
}

// ─── Connection handle ───────────────────────────────────────────────────────

/// Registry-side view of one subscription task.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub stream: StreamKind,
    pub generation: Generation,
    pub state: ConnectionState,
    close_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    pub(crate) fn new(
        id: ConnectionId,
        stream: StreamKind,
        generation: Generation,
        close_tx: oneshot::Sender<()>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            stream,
            generation,
            state: ConnectionState::Connecting,
            close_tx: Some(close_tx),
            task,
        }
    }

    /// Record a state change reported by the task. Invalid edges are logged and ignored.
    pub(crate) fn set_state(&mut self, next: ConnectionState) {
        if let Err(e) = self.state.transition(next) {
            tracing::warn!(connection = %self.id, stream = %self.stream, "{}", e);
        }
    }

    /// Ask the task to close gracefully. The task reports `Closed` when done.
    pub(crate) fn request_close(&mut self) {
        if let Some(tx) = self.close_tx.take() {
            if self.state != ConnectionState::Closed {
                self.set_state(ConnectionState::Closing);
            }
            let _ = tx.send(());
        }
    }}

// ─── Session ─────────────────────────────────────────────────────────────────

/// State of one slot.
#[derive(Debug)]
pub struct Session {
    pub slot: SlotId,
    pub kind: FeedKind,
    pub settings: SlotSettings,
    pub generation: Generation,
    pub window: RollingWindow,
    pub snapshot: Snapshot,
    /// Generation at which the in-flight backfill was requested.
    pub(crate) backfill_generation: Option<Generation>,
    pub(crate) backfill: Option<JoinHandle<()>>,
    pub(crate) reconnect: Option<JoinHandle<()>>,
    pub(crate) connections: Vec<ConnectionHandle>,
    /// A placeholder title is on the key and must be cleared by the next image.
    pub(crate) title_pending: bool,
}

impl Session {
    pub fn new(slot: SlotId, kind: FeedKind, settings: SlotSettings, generation: Generation) -> Self {
        let capacity = settings.chart_range.preset().capacity;
        Self {
            slot,
            kind,
            settings,
            generation,
            window: RollingWindow::new(capacity),
            snapshot: Snapshot::empty(kind),
            backfill_generation: None,
            backfill: None,
            reconnect: None,
            connections: Vec::new(),
            title_pending: false,
        }
    }

    /// Streams this session subscribes to with its current settings.
    pub fn streams(&self) -> Vec<StreamKind> {
        match self.kind {
            FeedKind::TickerKline => vec![
                StreamKind::Ticker,
                StreamKind::Kline(self.settings.chart_range.preset().interval),
            ],
            FeedKind::Depth => vec![StreamKind::Depth(self.settings.depth_level)],
        }
    }

    pub fn connections(&self) -> &[ConnectionHandle] {
        &self.connections
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_some()
    }

    /// Apply one stream message. Returns whether anything visible changed.
    pub fn apply_message(&mut self, stream: StreamKind, text: &str) -> Result<bool, ParseError> {
        match (stream, &mut self.snapshot) {
            (StreamKind::Ticker, Snapshot::Ticker(ticker)) => {
                let msg: WsTicker =
                    serde_json::from_str(text).map_err(|e| ParseError::json("ticker", e))?;
                ticker.apply_ticker(&msg);
                Ok(true)
            }
            (StreamKind::Kline(_), Snapshot::Ticker(_)) => {
                let msg: WsKlineEvent =
                    serde_json::from_str(text).map_err(|e| ParseError::json("kline", e))?;
                match closed_price(&msg) {
                    Some(close) => {
                        self.window.push(close);
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            (StreamKind::Depth(_), Snapshot::Depth(book)) => {
                let msg: WsPartialDepth =
                    serde_json::from_str(text).map_err(|e| ParseError::json("depth", e))?;
                book.apply(&msg);
                Ok(true)
            }
            (stream, _) => {
                tracing::debug!(slot = %self.slot, stream = %stream, "Message for a stream this session does not use");
                Ok(false)
            }
        }
    }

    /// Replace the window with backfilled closes.
    pub fn apply_backfill(&mut self, closes: Vec<f64>) {
        self.window.replace(closes);
    }

    /// Render the current state.
    pub fn render(&self) -> Artifact {
        match &self.snapshot {
            Snapshot::Ticker(ticker) => {
                let samples = self.window.snapshot();
                render_ticker(&TickerView {
                    symbol: &self.settings.symbol,
                    quote: ticker.quote,
                    samples: &samples,
                    opacity: self.settings.bg_opacity,
                })
            }
            Snapshot::Depth(book) => render_depth(&DepthView {
                symbol: &self.settings.symbol,
                level: self.settings.depth_level,
                book,
                opacity: self.settings.bg_opacity,
            }),
        }
    }

    /// Abort timers and the backfill, and ask every connection to close.
    pub(crate) fn teardown(&mut self) {
        if let Some(timer) = self.reconnect.take() {
            timer.abort();
        }
        if let Some(task) = self.backfill.take() {
            task.abort();
        }
        self.backfill_generation = None;
        for conn in &mut self.connections {
            conn.request_close();
        }
        self.connections.clear();
    }
}
