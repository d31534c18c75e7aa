//! StreamDock host connection over a local WebSocket.
//!
//! After registering, a reader task decodes host events into the engine queue
//! and a writer task drains [`HostCommand`]s onto the socket. When the host
//! goes away the reader posts [`EngineEvent::Shutdown`](crate::session::EngineEvent::Shutdown).

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{DockError, WsError};
use crate::host::{HostCommand, HostEvent, LaunchArgs};
use crate::session::engine::EngineHandle;
use crate::ws::native::{attempt_connect, WsStream};

/// Reader and writer tasks of a registered host connection.
pub struct StreamDockConnection {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl StreamDockConnection {
    /// Wait until the host closes the socket.
    pub async fn closed(self) {
        let _ = self.reader.await;
        self.writer.abort();
    }
}

/// Connect to the host, register, and start pumping in both directions.
pub async fn connect(
    args: &LaunchArgs,
    commands: mpsc::UnboundedReceiver<HostCommand>,
    engine: EngineHandle,
    timeout: Duration,
) -> Result<StreamDockConnection, DockError> {
    let url = args.url();
    tracing::info!(url = %url, uuid = %args.plugin_uuid, "Connecting to host");
    let (mut sink, stream) = attempt_connect(&url, timeout).await?;

    let registration = args.registration().to_string();
    sink.send(Message::Text(registration.into()))
        .await
        .map_err(|e| WsError::SendFailed(e.to_string()))?;
    tracing::info!(event = %args.register_event, "Registered with host");

    Ok(StreamDockConnection {
        reader: tokio::spawn(read_loop(stream, engine)),
        writer: tokio::spawn(write_loop(sink, commands)),
    })
}

async fn read_loop(mut stream: SplitStream<WsStream>, engine: EngineHandle) {
    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                tracing::info!(frame = ?frame, "Host closed the connection");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("Host connection error: {}", e);
                break;
            }
        };

        match HostEvent::decode(text.as_str()) {
            Ok(event) => {
                if engine.host_event(event).is_err() {
                    tracing::debug!("Engine gone, stopping host reader");
                    return;
                }
            }
            Err(e) => tracing::warn!("Dropping host message: {}", e),
        }
    }
    let _ = engine.shutdown();
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut commands: mpsc::UnboundedReceiver<HostCommand>,
) {
    while let Some(command) = commands.recv().await {
        let text = match command.to_message() {
            Ok(message) => message.to_string(),
            Err(e) => {
                tracing::warn!(slot = %command.slot(), "Failed to encode host command: {}", e);
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            tracing::warn!("Failed to write to host: {}", e);
            break;
        }
    }
}
