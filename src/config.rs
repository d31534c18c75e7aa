//! Engine configuration.
//!
//! Defaults match the exchange's public endpoints and the device plugin's timing.
//! Every value can be overridden from the environment or through [`EngineBuilder`].

use crate::error::DockError;
use std::time::Duration;

/// Delay between a connection closing and the reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
/// Interval of client WebSocket pings.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(180);
/// Upper bound on opening one stream.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_STREAM_URL: &str = "DOCK_TICKER_STREAM_URL";
pub const ENV_API_URL: &str = "DOCK_TICKER_API_URL";
pub const ENV_RECONNECT_MS: &str = "DOCK_TICKER_RECONNECT_MS";
pub const ENV_HEARTBEAT_MS: &str = "DOCK_TICKER_HEARTBEAT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Raw-stream base URL, e.g. `wss://stream.binance.com:9443/ws`.
    pub stream_url: String,
    /// REST base URL, e.g. `https://api.binance.com`.
    pub api_url: String,
    pub reconnect_delay: Duration,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream_url: crate::network::DEFAULT_STREAM_URL.to_string(),
            api_url: crate::network::DEFAULT_API_URL.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `DOCK_TICKER_*` environment variables.
    pub fn from_env() -> Result<Self, DockError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DockError> {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_STREAM_URL).filter(|v| !v.trim().is_empty()) {
            config.stream_url = url.trim().to_string();
        }
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_RECONNECT_MS) {
            config.reconnect_delay = parse_millis(ENV_RECONNECT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HEARTBEAT_MS) {
            config.heartbeat_interval = parse_millis(ENV_HEARTBEAT_MS, &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject timings the engine cannot run with. Every duration must be non-zero.
    pub fn validate(&self) -> Result<(), DockError> {
        let timings = [
            ("reconnect_delay", self.reconnect_delay),
            ("heartbeat_interval", self.heartbeat_interval),
            ("connect_timeout", self.connect_timeout),
        ];
        match timings.iter().find(|(_, value)| value.is_zero()) {
            Some((name, _)) => Err(DockError::Config(format!("{} must be non-zero", name))),
            None => Ok(()),
        }
    }
}

fn parse_millis(name: &str, raw: &str) -> Result<Duration, DockError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(DockError::Config(format!(
            "{} must be a positive number of milliseconds, got {:?}",
            name, raw
        ))),
    }
}
