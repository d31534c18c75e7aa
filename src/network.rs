//! Network URL constants for the Binance public endpoints.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.binance.com";

/// Default raw-stream WebSocket base URL. Stream names are appended as a path segment.
pub const DEFAULT_STREAM_URL: &str = "wss://stream.binance.com:9443/ws";

/// Host address the StreamDock runtime listens on.
pub const HOST_ADDRESS: &str = "ws://127.0.0.1";
