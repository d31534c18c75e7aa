//! Unified error types.

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum DockError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("WebSocket error: {0}")]
    Ws(#[from] WsError),

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// HTTP-layer errors.
#[derive(Error, Debug)]
pub enum HttpError {
    #[cfg(feature = "http")]
    #[error("Request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

/// WebSocket errors.
#[derive(Error, Debug)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

/// Errors talking to the device host.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Missing launch argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid launch argument {name}: {value}")]
    InvalidArgument { name: &'static str, value: String },

    #[error("Host connection closed")]
    ChannelClosed,
}

/// A payload that could not be decoded.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed {what}: {source}")]
    Json {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid number in {what}: {value}")]
    Number { what: &'static str, value: String },
}

impl ParseError {
    pub(crate) fn json(what: &'static str, source: serde_json::Error) -> Self {
        ParseError::Json { what, source }
    }
}
