//! WebSocket layer: stream descriptors, frames, and the provider seam.
//!
//! The real transport lives behind the `ws-native` feature (`native.rs`,
//! `tokio-tungstenite`). Sessions only see the [`FeedProvider`] and
//! [`FeedConnection`] traits, so tests drive them with in-memory doubles.

#[cfg(feature = "ws-native")]
pub mod native;

use crate::domain::settings::DepthLevel;
use crate::error::WsError;
use crate::shared::{Interval, Symbol};
use async_trait::async_trait;

// ─── Stream descriptors ──────────────────────────────────────────────────────

/// Which stream of a symbol to subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// `<symbol>@ticker`
    Ticker,
    /// `<symbol>@kline_<interval>`
    Kline(Interval),
    /// `<symbol>@depth<levels>`
    Depth(DepthLevel),
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Ticker => write!(f, "ticker"),
            StreamKind::Kline(i) => write!(f, "kline_{}", i),
            StreamKind::Depth(level) => write!(f, "depth{}", level.count()),
        }
    }
}

/// One raw stream of the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamDescriptor {
    pub symbol: Symbol,
    pub kind: StreamKind,
}

impl StreamDescriptor {
    pub fn new(symbol: Symbol, kind: StreamKind) -> Self {
        Self { symbol, kind }
    }

    /// Stream name as used in the URL path: `btcusdt@kline_15m`.
    pub fn stream_name(&self) -> String {
        format!("{}@{}", self.symbol.stream_name(), self.kind)
    }

    /// Full raw-stream URL under `base` (`wss://…/ws`).
    pub fn url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.stream_name())
    }
}

impl std::fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.stream_name())
    }
}

// ─── Frames ──────────────────────────────────────────────────────────────────

/// Transport-level frame handed to the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close { code: Option<u16>, reason: String },
}

// ─── Connection state ────────────────────────────────────────────────────────

/// Lifecycle of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    /// Allowed edges: `Connecting → Open → Closing → Closed`, plus
    /// `Connecting → Closing`, `Connecting → Closed` and `Open → Closed`.
    pub fn can_transition(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Open)
                | (Connecting, Closing)
                | (Connecting, Closed)
                | (Open, Closing)
                | (Open, Closed)
                | (Closing, Closed)
        )
    }

    /// Move to `next`, or report the rejected edge and stay put.
    pub fn transition(&mut self, next: ConnectionState) -> Result<(), WsError> {
        if self.can_transition(next) {
            *self = next;
            Ok(())
        } else {
            Err(WsError::ProtocolError(format!(
                "invalid connection transition {:?} -> {:?}",
                self, next
            )))
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Closed
    }
}

// ─── Provider seam ───────────────────────────────────────────────────────────

/// Opens live subscriptions.
#[async_trait]
pub trait FeedProvider: Send + Sync {
    async fn subscribe(&self, stream: &StreamDescriptor) -> Result<Box<dyn FeedConnection>, WsError>;
}

/// An open subscription.
#[async_trait]
pub trait FeedConnection: Send {
    /// Next frame from the server; `None` once the transport has ended.
    async fn next_frame(&mut self) -> Option<Result<Frame, WsError>>;

    async fn send_ping(&mut self, payload: Vec<u8>) -> Result<(), WsError>;

    async fn send_pong(&mut self, payload: Vec<u8>) -> Result<(), WsError>;

    /// Start a graceful close.
    async fn close(&mut self) -> Result<(), WsError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn test_stream_names() {
        let btc = Symbol::new("BTCUSDT");
        assert_eq!(
            StreamDescriptor::new(btc.clone(), StreamKind::Ticker).stream_name(),
            "btcusdt@ticker"
        );
        assert_eq!(
            StreamDescriptor::new(btc.clone(), StreamKind::Kline(Interval::Minute15)).stream_name(),
            "btcusdt@kline_15m"
        );
        assert_eq!(
            StreamDescriptor::new(btc, StreamKind::Depth(DepthLevel::Twenty)).stream_name(),
            "btcusdt@depth20"
        );
    }

    #[test]
    fn test_stream_url() {
        let d = StreamDescriptor::new(Symbol::new("ethusdt"), StreamKind::Ticker);
        assert_eq!(
            d.url("wss://stream.binance.com:9443/ws/"),
            "wss://stream.binance.com:9443/ws/ethusdt@ticker"
        );
    }

    #[test]
    fn test_transition_table() {
        let all = [Connecting, Open, Closing, Closed];
        let allowed = [
            (Connecting, Open),
            (Connecting, Closing),
            (Connecting, Closed),
            (Open, Closing),
            (Open, Closed),
            (Closing, Closed),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition(to),
                    allowed.contains(&(from, to)),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_rejected_transition_keeps_state() {
        let mut state = Closed;
        assert!(state.transition(Open).is_err());
        assert_eq!(state, Closed);

        let mut state = Connecting;
        state.transition(Open).unwrap();
        state.transition(Closing).unwrap();
        state.transition(Closed).unwrap();
        assert!(state.is_terminal());
    }
}
