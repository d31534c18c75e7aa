//! Native WebSocket transport: `tokio-tungstenite`.
//!
//! One socket per raw stream. Keepalive and reconnection are owned by the session
//! layer; this module only moves frames.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::WsError;
use crate::ws::{FeedConnection, FeedProvider, Frame, StreamDescriptor};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens raw streams under a base URL such as `wss://stream.binance.com:9443/ws`.
#[derive(Debug, Clone)]
pub struct TungsteniteProvider {
    base_url: String,
    connect_timeout: Duration,
}

impl TungsteniteProvider {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            connect_timeout,
        }
    }
}

#[async_trait]
impl FeedProvider for TungsteniteProvider {
    async fn subscribe(&self, stream: &StreamDescriptor) -> Result<Box<dyn FeedConnection>, WsError> {
        let url = stream.url(&self.base_url);
        tracing::debug!(url = %url, "Opening stream");
        let (sink, stream) = attempt_connect(&url, self.connect_timeout).await?;
        Ok(Box::new(TungsteniteConnection { sink, stream }))
    }
}

/// A single open raw stream.
pub struct TungsteniteConnection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FeedConnection for TungsteniteConnection {
    async fn next_frame(&mut self) -> Option<Result<Frame, WsError>> {
        loop {
            let msg = match self.stream.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(WsError::ConnectionFailed(e.to_string()))),
            };
            let frame = match msg {
                Message::Text(text) => Frame::Text(text.as_str().to_owned()),
                Message::Ping(data) => Frame::Ping(data.to_vec()),
                Message::Pong(data) => Frame::Pong(data.to_vec()),
                Message::Close(frame) => {
                    let (code, reason) = extract_close(frame.as_ref());
                    Frame::Close {
                        code: Some(code),
                        reason,
                    }
                }
                // Market streams are text only.
                Message::Binary(_) | Message::Frame(_) => continue,
            };
            return Some(Ok(frame));
        }
    }

    async fn send_ping(&mut self, payload: Vec<u8>) -> Result<(), WsError> {
        self.sink
            .send(Message::Ping(payload.into()))
            .await
            .map_err(|e| WsError::SendFailed(e.to_string()))
    }

    async fn send_pong(&mut self, payload: Vec<u8>) -> Result<(), WsError> {
        self.sink
            .send(Message::Pong(payload.into()))
            .await
            .map_err(|e| WsError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), WsError> {
        self.sink
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "Client disconnect".into(),
            })))
            .await
            .map_err(|e| WsError::SendFailed(e.to_string()))
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Establish a WebSocket connection, bounded by `timeout`.
pub(crate) async fn attempt_connect(
    url: &str,
    timeout: Duration,
) -> Result<(SplitSink<WsStream, Message>, SplitStream<WsStream>), WsError> {
    let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(url))
        .await
        .map_err(|_| WsError::Timeout)?
        .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

    Ok(ws_stream.split())
}

/// Extract close code and reason from an optional CloseFrame.
fn extract_close(frame: Option<&CloseFrame>) -> (u16, String) {
    match frame {
        Some(f) => (f.code.into(), f.reason.to_string()),
        None => (1005, "No close frame".into()),
    }
}
