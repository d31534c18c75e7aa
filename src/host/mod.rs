//! Host boundary: the StreamDock device runtime.
//!
//! Inbound JSON events are decoded into [`HostEvent`]s; outbound calls go through
//! the [`Host`] trait as [`HostCommand`]s. The WebSocket adapter itself lives behind
//! the `ws-native` feature (`streamdock.rs`).

#[cfg(feature = "ws-native")]
pub mod streamdock;

use crate::domain::settings::{FeedKind, PersistedSettings, SettingsPatch, UserAction};
use crate::error::{HostError, ParseError};
use crate::render::Artifact;
use crate::shared::SlotId;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

// ─── Inbound ─────────────────────────────────────────────────────────────────

/// A decoded host event.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// `willAppear`
    SlotAppear {
        slot: SlotId,
        kind: FeedKind,
        settings: SettingsPatch,
    },
    /// `willDisappear`
    SlotDisappear { slot: SlotId },
    /// `didReceiveSettings`
    SettingsChanged { slot: SlotId, settings: SettingsPatch },
    /// `keyUp`
    ManualAction { slot: SlotId },
    /// `sendToPlugin`
    UserMessage { slot: SlotId, action: UserAction },
    /// Anything else the host sends.
    Ignored { event: String },
}

/// Events addressed to a slot. Everything else is ignored.
const SLOT_EVENTS: &[&str] = &[
    "willAppear",
    "willDisappear",
    "didReceiveSettings",
    "keyUp",
    "sendToPlugin",
];

#[derive(Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    context: Option<SlotId>,
    #[serde(default)]
    payload: serde_json::Value,
}

impl HostEvent {
    /// Decode one inbound host message.
    pub fn decode(text: &str) -> Result<HostEvent, ParseError> {
        let raw: RawEvent =
            serde_json::from_str(text).map_err(|e| ParseError::json("host event", e))?;

        let RawEvent {
            event,
            action,
            context,
            payload,
        } = raw;

        let Some(slot) = context.filter(|_| SLOT_EVENTS.contains(&event.as_str())) else {
            return Ok(HostEvent::Ignored { event });
        };

        let decoded = match event.as_str() {
            "willAppear" => HostEvent::SlotAppear {
                kind: FeedKind::from_action(action.as_deref().unwrap_or_default()),
                settings: settings_of(&payload, &slot),
                slot,
            },
            "willDisappear" => HostEvent::SlotDisappear { slot },
            "didReceiveSettings" => HostEvent::SettingsChanged {
                settings: settings_of(&payload, &slot),
                slot,
            },
            "keyUp" => HostEvent::ManualAction { slot },
            "sendToPlugin" => {
                let action = UserAction::deserialize(&payload)
                    .map_err(|e| ParseError::json("sendToPlugin payload", e))?;
                HostEvent::UserMessage { slot, action }
            }
            other => HostEvent::Ignored {
                event: other.to_string(),
            },
        };
        Ok(decoded)
    }
}

/// `payload.settings`, or defaults when missing or malformed.
fn settings_of(payload: &serde_json::Value, slot: &SlotId) -> SettingsPatch {
    match payload.get("settings") {
        None | Some(serde_json::Value::Null) => SettingsPatch::default(),
        Some(settings) => SettingsPatch::deserialize(settings).unwrap_or_else(|e| {
            tracing::warn!(slot = %slot, "Ignoring malformed settings: {}", e);
            SettingsPatch::default()
        }),
    }
}

// ─── Outbound ────────────────────────────────────────────────────────────────

/// A command for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    SetImage { slot: SlotId, artifact: Artifact },
    SetTitle { slot: SlotId, title: String },
    SetSettings { slot: SlotId, settings: PersistedSettings },
    ShowOk { slot: SlotId },
}

impl HostCommand {
    pub fn slot(&self) -> &SlotId {
        match self {
            HostCommand::SetImage { slot, .. }
            | HostCommand::SetTitle { slot, .. }
            | HostCommand::SetSettings { slot, .. }
            | HostCommand::ShowOk { slot } => slot,
        }
    }

    /// Wire form sent to the host.
    pub fn to_message(&self) -> Result<serde_json::Value, serde_json::Error> {
        Ok(match self {
            HostCommand::SetImage { slot, artifact } => json!({
                "event": "setImage",
                "context": slot,
                "payload": { "image": artifact.to_data_url(), "target": 0 },
            }),
            HostCommand::SetTitle { slot, title } => json!({
                "event": "setTitle",
                "context": slot,
                "payload": { "title": title, "target": 0 },
            }),
            HostCommand::SetSettings { slot, settings } => json!({
                "event": "setSettings",
                "context": slot,
                "payload": serde_json::to_value(settings)?,
            }),
            HostCommand::ShowOk { slot } => json!({
                "event": "showOk",
                "context": slot,
            }),
        })
    }
}

/// Outbound side of the host connection.
pub trait Host: Send + Sync {
    fn send(&self, command: HostCommand) -> Result<(), HostError>;

    fn set_image(&self, slot: &SlotId, artifact: Artifact) -> Result<(), HostError> {
        self.send(HostCommand::SetImage {
            slot: slot.clone(),
            artifact,
        })
    }

    fn set_title(&self, slot: &SlotId, title: &str) -> Result<(), HostError> {
        self.send(HostCommand::SetTitle {
            slot: slot.clone(),
            title: title.to_string(),
        })
    }

    fn set_settings(&self, slot: &SlotId, settings: PersistedSettings) -> Result<(), HostError> {
        self.send(HostCommand::SetSettings {
            slot: slot.clone(),
            settings,
        })
    }

    fn show_ok(&self, slot: &SlotId) -> Result<(), HostError> {
        self.send(HostCommand::ShowOk { slot: slot.clone() })
    }
}

/// [`Host`] that queues commands for a writer task.
#[derive(Debug, Clone)]
pub struct ChannelHost {
    tx: mpsc::UnboundedSender<HostCommand>,
}

impl ChannelHost {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<HostCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Host for ChannelHost {
    fn send(&self, command: HostCommand) -> Result<(), HostError> {
        self.tx.send(command).map_err(|_| HostError::ChannelClosed)
    }
}

// ─── Launch arguments ────────────────────────────────────────────────────────

/// Command line the host starts the plugin with:
/// `-port <p> -pluginUUID <uuid> -registerEvent <event> -info <json>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchArgs {
    pub port: u16,
    pub plugin_uuid: String,
    pub register_event: String,
    /// Raw host/application info; only logged.
    pub info: Option<String>,
}

impl LaunchArgs {
    /// Parse from the process arguments (without the program name).
    pub fn parse<I, S>(args: I) -> Result<Self, HostError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut port = None;
        let mut plugin_uuid = None;
        let mut register_event = None;
        let mut info = None;

        let mut iter = args.into_iter().map(Into::into);
        while let Some(flag) = iter.next() {
            let slot = match flag.as_str() {
                "-port" => &mut port,
                "-pluginUUID" => &mut plugin_uuid,
                "-registerEvent" => &mut register_event,
                "-info" => &mut info,
                other => {
                    tracing::debug!(arg = other, "Ignoring unknown launch argument");
                    continue;
                }
            };
            *slot = iter.next();
        }

        let port_raw = port.ok_or(HostError::MissingArgument("-port"))?;
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|_| HostError::InvalidArgument {
                name: "-port",
                value: port_raw.clone(),
            })?;

        Ok(Self {
            port,
            plugin_uuid: plugin_uuid.ok_or(HostError::MissingArgument("-pluginUUID"))?,
            register_event: register_event.ok_or(HostError::MissingArgument("-registerEvent"))?,
            info,
        })
    }

    /// `{"event": <registerEvent>, "uuid": <pluginUUID>}`
    pub fn registration(&self) -> serde_json::Value {
        json!({ "event": self.register_event, "uuid": self.plugin_uuid })
    }

    pub fn url(&self) -> String {
        format!("{}:{}", crate::network::HOST_ADDRESS, self.port)
    }
}
