//! The engine: a single task that owns the [`SessionRegistry`] and serializes
//! every host event, stream event, timer and backfill result through one queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::EngineConfig;
use crate::domain::settings::SlotSettings;
use crate::error::{DockError, HostError};
use crate::host::{Host, HostEvent};
use crate::session::backfill::HistorySource;
use crate::session::registry::SessionRegistry;
use crate::session::EngineEvent;
use crate::ws::FeedProvider;

/// Owns the registry and the event queue feeding it.
pub struct Engine {
    registry: SessionRegistry,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
}

/// Cloneable sender into a running [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineHandle {
    pub fn send(&self, event: EngineEvent) -> Result<(), HostError> {
        self.tx.send(event).map_err(|_| HostError::ChannelClosed)
    }

    pub fn host_event(&self, event: HostEvent) -> Result<(), HostError> {
        self.send(EngineEvent::Host(event))
    }

    pub fn shutdown(&self) -> Result<(), HostError> {
        self.send(EngineEvent::Shutdown)
    }
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub(crate) fn new(
        config: EngineConfig,
        provider: Arc<dyn FeedProvider>,
        history: Arc<dyn HistorySource>,
        host: Arc<dyn Host>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let registry = SessionRegistry::new(config, provider, history, host, events_tx.clone());
        Self {
            registry,
            events_tx,
            events_rx,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.events_tx.clone(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Process events until [`EngineEvent::Shutdown`].
    pub async fn run(mut self) {
        tracing::info!("Engine started");
        while let Some(event) = self.events_rx.recv().await {
            if !self.dispatch(event) {
                break;
            }
        }
        tracing::info!("Engine stopped");
    }

    /// Wait for the next queued event.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.events_rx.recv().await
    }

    /// Next queued event, if one is ready.
    pub fn try_next_event(&mut self) -> Option<EngineEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Apply one event. Returns `false` once the engine has shut down.
    pub fn dispatch(&mut self, event: EngineEvent) -> bool {
        match event {
            EngineEvent::Host(event) => self.on_host_event(event),
            EngineEvent::Feed(event) => self.registry.on_feed_event(event),
            EngineEvent::ReconnectDue { slot, generation } => {
                self.registry.on_reconnect_due(&slot, generation)
            }
            EngineEvent::BackfillDone {
                slot,
                generation,
                result,
            } => self.registry.on_backfill_done(&slot, generation, result),
            EngineEvent::Shutdown => {
                tracing::info!(sessions = self.registry.len(), "Shutting down");
                self.registry.shutdown();
                return false;
            }
        }
        true
    }

    fn on_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::SlotAppear {
                slot,
                kind,
                settings,
            } => {
                let settings = SlotSettings::default().merged(&settings);
                self.registry.start(slot, kind, settings);
            }
            HostEvent::SlotDisappear { slot } => self.registry.stop(&slot),
            HostEvent::SettingsChanged { slot, settings } => {
                self.registry.update_config(&slot, &settings)
            }
            HostEvent::ManualAction { slot } => self.registry.manual_refresh(&slot),
            HostEvent::UserMessage { slot, action } => self.registry.on_user_action(&slot, action),
            HostEvent::Ignored { event } => tracing::debug!(event = %event, "Ignoring host event"),
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    provider: Option<Arc<dyn FeedProvider>>,
    history: Option<Arc<dyn HistorySource>>,
}

impl EngineBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stream_url(mut self, url: &str) -> Self {
        self.config.stream_url = url.to_string();
        self
    }

    pub fn api_url(mut self, url: &str) -> Self {
        self.config.api_url = url.to_string();
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Use a custom stream source instead of the exchange WebSocket.
    pub fn provider(mut self, provider: Arc<dyn FeedProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use a custom history source instead of the exchange REST API.
    pub fn history(mut self, history: Arc<dyn HistorySource>) -> Self {
        self.history = Some(history);
        self
    }

    /// Fails with [`DockError::Config`] if any configured duration is zero.
    pub fn build(self, host: Arc<dyn Host>) -> Result<Engine, DockError> {
        self.config.validate()?;
        let provider = match self.provider {
            Some(provider) => provider,
            None => default_provider(&self.config)?,
        };
        let history = match self.history {
            Some(history) => history,
            None => default_history(&self.config)?,
        };
        Ok(Engine::new(self.config, provider, history, host))
    }
}

#[cfg(feature = "ws-native")]
fn default_provider(config: &EngineConfig) -> Result<Arc<dyn FeedProvider>, DockError> {
    Ok(Arc::new(crate::ws::native::TungsteniteProvider::new(
        &config.stream_url,
        config.connect_timeout,
    )))
}

#[cfg(not(feature = "ws-native"))]
fn default_provider(_config: &EngineConfig) -> Result<Arc<dyn FeedProvider>, DockError> {
    Err(DockError::Config(
        "no feed provider: enable the `ws-native` feature or call `provider()`".into(),
    ))
}

#[cfg(feature = "http")]
fn default_history(config: &EngineConfig) -> Result<Arc<dyn HistorySource>, DockError> {
    Ok(Arc::new(crate::http::BinanceHttp::new(&config.api_url)))
}

#[cfg(not(feature = "http"))]
fn default_history(_config: &EngineConfig) -> Result<Arc<dyn HistorySource>, DockError> {
    Err(DockError::Config(
        "no history source: enable the `http` feature or call `history()`".into(),
    ))
}
