//! # dock-ticker
//!
//! Live Binance market keys for StreamDock devices: a price ticker with a
//! sparkline of recent closes, and an order-book pressure gauge.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core**: Settings, rolling window, ticker and depth state, wire types (no I/O)
//! 2. **Render**: Pure SVG rendering of a session into a key image
//! 3. **HTTP API**: `BinanceHttp` kline backfill with retry policies
//! 4. **WebSocket**: `FeedProvider` seam with a `tokio-tungstenite` implementation
//! 5. **Sessions**: One session per slot, driven by a single engine task
//! 6. **Host**: StreamDock event decoding, outbound commands, launch arguments
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dock_ticker::prelude::*;
//!
//! let (host, commands) = ChannelHost::channel();
//! let engine = Engine::builder()
//!     .reconnect_delay(std::time::Duration::from_secs(5))
//!     .build(std::sync::Arc::new(host))?;
//!
//! engine.handle().host_event(HostEvent::decode(raw)?)?;
//! engine.run().await;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all modules.
pub mod shared;

/// Domain modules: settings, window, ticker and depth state.
pub mod domain;

/// Unified error types.
pub mod error;

/// Network URL constants.
pub mod network;

/// Engine configuration and environment overrides.
pub mod config;

// ── Layer 2: Render ──────────────────────────────────────────────────────────

/// SVG key rendering.
pub mod render;

// ── Layer 3: HTTP API ────────────────────────────────────────────────────────

/// REST client with retry policies.
#[cfg(feature = "http")]
pub mod http;

// ── Layer 4: WebSocket ───────────────────────────────────────────────────────

/// Stream descriptors, connection state and the transport seam.
pub mod ws;

// ── Layer 5: Sessions ────────────────────────────────────────────────────────

/// Sessions, registry and the engine loop.
pub mod session;

// ── Layer 6: Host ────────────────────────────────────────────────────────────

/// StreamDock host protocol.
pub mod host;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{Interval, SlotId, Symbol};

    // Domain types
    pub use crate::domain::depth::{DepthBook, Level};
    pub use crate::domain::settings::{
        ChartRange, DepthLevel, FeedKind, Opacity, PersistedSettings, SettingsPatch, SlotSettings,
        UserAction,
    };
    pub use crate::domain::ticker::{TickerQuote, TickerSnapshot};
    pub use crate::domain::window::RollingWindow;

    // Errors
    pub use crate::error::{DockError, HostError, HttpError, ParseError, WsError};

    // Configuration
    pub use crate::config::EngineConfig;
    pub use crate::network::{DEFAULT_API_URL, DEFAULT_STREAM_URL};

    // Rendering
    pub use crate::render::Artifact;

    // HTTP client
    #[cfg(feature = "http")]
    pub use crate::http::{BinanceHttp, RetryConfig, RetryPolicy};

    // WebSocket seam
    pub use crate::ws::{ConnectionState, FeedConnection, FeedProvider, Frame, StreamDescriptor, StreamKind};
    #[cfg(feature = "ws-native")]
    pub use crate::ws::native::TungsteniteProvider;

    // Sessions
    pub use crate::session::backfill::HistorySource;
    pub use crate::session::engine::{Engine, EngineBuilder, EngineHandle};
    pub use crate::session::registry::SessionRegistry;
    pub use crate::session::{EngineEvent, Session, Snapshot};

    // Host
    pub use crate::host::{ChannelHost, Host, HostCommand, HostEvent, LaunchArgs};
}
