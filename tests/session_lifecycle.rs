//! Session lifecycle tests against in-memory streams, history and host.
//!
//! Time is paused, so reconnect delays elapse instantly and deterministically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use dock_ticker::prelude::*;

const TICKER: &str = "btcusdt@ticker";
const KLINE: &str = "btcusdt@kline_15m";

// ─── Doubles ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MockProvider {
    state: Mutex<ProviderState>,
}

#[derive(Default)]
struct ProviderState {
    subscriptions: Vec<String>,
    feeds: HashMap<String, mpsc::UnboundedSender<Frame>>,
}

impl MockProvider {
    fn subscriptions(&self) -> Vec<String> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    fn count(&self, stream: &str) -> usize {
        self.subscriptions().iter().filter(|s| *s == stream).count()
    }

    /// Deliver a frame on the latest connection to `stream`.
    fn push(&self, stream: &str, frame: Frame) {
        let state = self.state.lock().unwrap();
        let feed = state.feeds.get(stream).expect("stream was never subscribed");
        feed.send(frame).expect("connection task is gone");
    }

    fn text(&self, stream: &str, text: &str) {
        self.push(stream, Frame::Text(text.to_string()));
    }

    fn close_remote(&self, stream: &str) {
        self.push(
            stream,
            Frame::Close {
                code: Some(1006),
                reason: "Abnormal closure".into(),
            },
        );
    }
}

#[async_trait]
impl FeedProvider for MockProvider {
    async fn subscribe(&self, stream: &StreamDescriptor) -> Result<Box<dyn FeedConnection>, WsError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().unwrap();
        state.subscriptions.push(stream.stream_name());
        state.feeds.insert(stream.stream_name(), tx);
        Ok(Box::new(MockConnection { rx }))
    }
}

struct MockConnection {
    rx: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl FeedConnection for MockConnection {
    async fn next_frame(&mut self) -> Option<Result<Frame, WsError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn send_ping(&mut self, _payload: Vec<u8>) -> Result<(), WsError> {
        Ok(())
    }

    async fn send_pong(&mut self, _payload: Vec<u8>) -> Result<(), WsError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WsError> {
        Ok(())
    }
}

struct MockHistory {
    closes: Vec<f64>,
    calls: Mutex<Vec<(String, Interval, usize)>>,
}

impl MockHistory {
    fn new(closes: Vec<f64>) -> Self {
        Self {
            closes,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, Interval, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistorySource for MockHistory {
    async fn closes(&self, symbol: &Symbol, interval: Interval, limit: usize) -> Result<Vec<f64>, HttpError> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.as_str().to_string(), interval, limit));
        Ok(self.closes.clone())
    }
}

#[derive(Default)]
struct RecordingHost {
    commands: Mutex<Vec<HostCommand>>,
}

impl RecordingHost {
    fn commands(&self) -> Vec<HostCommand> {
        self.commands.lock().unwrap().clone()
    }

    fn images(&self) -> Vec<Artifact> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                HostCommand::SetImage { artifact, .. } => Some(artifact),
                _ => None,
            })
            .collect()
    }

    fn titles(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                HostCommand::SetTitle { title, .. } => Some(title),
                _ => None,
            })
            .collect()
    }

    fn last_image(&self) -> Artifact {
        self.images().pop().expect("no image was pushed")
    }
}

impl Host for RecordingHost {
    fn send(&self, command: HostCommand) -> Result<(), HostError> {
        self.commands.lock().unwrap().push(command);
        Ok(())
    }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

struct Harness {
    engine: Engine,
    provider: Arc<MockProvider>,
    history: Arc<MockHistory>,
    host: Arc<RecordingHost>,
}

impl Harness {
    fn new(closes: Vec<f64>) -> Self {
        let provider = Arc::new(MockProvider::default());
        let history = Arc::new(MockHistory::new(closes));
        let host = Arc::new(RecordingHost::default());
        let engine = Engine::builder()
            .provider(provider.clone())
            .history(history.clone())
            .build(host.clone())
            .unwrap();
        Self {
            engine,
            provider,
            history,
            host,
        }
    }

    /// Let spawned tasks run and drain everything they posted.
    async fn settle(&mut self) {
        for _ in 0..32 {
            tokio::task::yield_now().await;
            while let Some(event) = self.engine.try_next_event() {
                self.engine.dispatch(event);
            }
        }
    }

    async fn host_event(&mut self, raw: &str) {
        let event = HostEvent::decode(raw).unwrap();
        self.engine.dispatch(EngineEvent::Host(event));
        self.settle().await;
    }

    async fn appear_ticker(&mut self, slot: &str, settings: &str) {
        let raw = format!(
            r#"{{"event":"willAppear","action":"com.hotspot.binance.ticker","context":"{slot}","payload":{{"settings":{settings}}}}}"#
        );
        self.host_event(&raw).await;
    }

    async fn wait(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
        self.settle().await;
    }

    fn session(&self, slot: &str) -> &Session {
        self.engine
            .registry()
            .get(&SlotId::from(slot))
            .expect("session should exist")
    }

    fn connection_ids(&self, slot: &str) -> Vec<u64> {
        self.session(slot).connections().iter().map(|c| c.id.0).collect()
    }
}

fn ticker_msg(price: &str, change: &str) -> String {
    format!(r#"{{"e":"24hrTicker","E":1700000000000,"s":"BTCUSDT","c":"{price}","P":"{change}"}}"#)
}

fn kline_msg(close: &str, closed: bool) -> String {
    format!(
        r#"{{"e":"kline","E":1700000000000,"s":"BTCUSDT","k":{{"t":1699999100000,"i":"15m","c":"{close}","x":{closed}}}}}"#
    )
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_ticker_end_to_end() {
    // A short history, so the closed kline grows the window instead of evicting.
    let mut h = Harness::new(vec![49_900.0, 49_950.0, 49_980.0]);
    h.appear_ticker("key1", r#"{"symbol":"btcusdt"}"#).await;

    assert_eq!(h.host.titles().first().map(String::as_str), Some("BTCUSDT\nLoading…"));
    let mut subscribed = h.provider.subscriptions();
    subscribed.sort();
    assert_eq!(subscribed, vec![KLINE.to_string(), TICKER.to_string()]);
    assert_eq!(h.history.calls(), vec![("BTCUSDT".to_string(), Interval::Minute15, 24)]);
    assert_eq!(h.session("key1").window.len(), 3);

    // The first image clears the placeholder title.
    assert_eq!(h.host.images().len(), 1);
    assert_eq!(h.host.titles().last().map(String::as_str), Some(""));

    // In-progress candles never reach the window.
    h.provider.text(KLINE, &kline_msg("49999.00", false));
    h.settle().await;
    assert_eq!(h.host.images().len(), 1);

    h.provider.text(KLINE, &kline_msg("50000.00", true));
    h.settle().await;
    let window = &h.session("key1").window;
    assert_eq!(window.len(), 4);
    assert_eq!(window.snapshot(), vec![49_900.0, 49_950.0, 49_980.0, 50_000.0]);

    h.provider.text(TICKER, &ticker_msg("50500.00", "1.000"));
    h.settle().await;
    assert_eq!(h.host.last_image().summary, "BTC $50500 ▲+1.00%");

    for conn in h.session("key1").connections() {
        assert_eq!(conn.state, ConnectionState::Open);
    }
}

#[tokio::test(start_paused = true)]
async fn test_malformed_message_is_dropped() {
    let mut h = Harness::new(vec![]);
    h.appear_ticker("key1", "{}").await;
    let images = h.host.images().len();

    h.provider.text(TICKER, "{not json");
    h.settle().await;

    assert_eq!(h.host.images().len(), images);
    assert_eq!(h.session("key1").connections().len(), 2);
    assert!(!h.session("key1").reconnect_pending());
}

#[tokio::test(start_paused = true)]
async fn test_stop_then_close_does_not_reconnect() {
    let mut h = Harness::new(vec![]);
    h.appear_ticker("key1", "{}").await;
    assert_eq!(h.provider.subscriptions().len(), 2);

    h.host_event(r#"{"event":"willDisappear","context":"key1"}"#).await;
    assert!(h.engine.registry().is_empty());

    // A late close from the old generation must be ignored.
    h.engine.dispatch(EngineEvent::Feed(dock_ticker::session::FeedEvent {
        slot: SlotId::from("key1"),
        generation: 1,
        connection: dock_ticker::session::ConnectionId(1),
        stream: StreamKind::Ticker,
        kind: dock_ticker::session::FeedEventKind::Closed {
            code: Some(1006),
            reason: "gone".into(),
        },
    }));
    h.wait(Duration::from_secs(10)).await;

    assert_eq!(h.provider.subscriptions().len(), 2);
    assert!(h.engine.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_opacity_change_redraws_in_place() {
    let mut h = Harness::new(vec![]);
    h.appear_ticker("key1", "{}").await;
    let ids = h.connection_ids("key1");
    let generation = h.session("key1").generation;

    h.host_event(r#"{"event":"didReceiveSettings","context":"key1","payload":{"settings":{"bgOpacity":40}}}"#)
        .await;

    assert_eq!(h.connection_ids("key1"), ids);
    assert_eq!(h.session("key1").generation, generation);
    assert_eq!(h.provider.subscriptions().len(), 2);
    assert!(h.host.last_image().svg.contains(r#"fill-opacity="0.40""#));
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_settings_are_a_no_op() {
    let mut h = Harness::new(vec![]);
    h.appear_ticker("key1", r#"{"symbol":"BTCUSDT"}"#).await;
    let commands = h.host.commands().len();

    h.host_event(r#"{"event":"didReceiveSettings","context":"key1","payload":{"settings":{"symbol":"btcusdt"}}}"#)
        .await;

    assert_eq!(h.host.commands().len(), commands);
    assert_eq!(h.provider.subscriptions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_symbol_change_restarts_once() {
    let mut h = Harness::new(vec![100.0, 101.0]);
    h.appear_ticker("key1", "{}").await;
    let old_ids = h.connection_ids("key1");
    let old_generation = h.session("key1").generation;

    h.host_event(
        r#"{"event":"sendToPlugin","context":"key1","payload":{"action":"changeSymbol","symbol":"ethusdt"}}"#,
    )
    .await;

    let session = h.session("key1");
    assert_eq!(session.settings.symbol.as_str(), "ETHUSDT");
    assert!(session.generation > old_generation);
    assert!(h.connection_ids("key1").iter().all(|id| !old_ids.contains(id)));
    assert_eq!(h.provider.count("ethusdt@ticker"), 1);
    assert_eq!(h.provider.count("ethusdt@kline_15m"), 1);

    // The merged settings are persisted.
    assert!(h.host.commands().iter().any(|c| matches!(
        c,
        HostCommand::SetSettings { settings, .. } if settings.symbol.as_str() == "ETHUSDT"
    )));

    // The old connections closing must not schedule a second cycle.
    h.wait(Duration::from_secs(6)).await;
    assert_eq!(h.provider.subscriptions().len(), 4);
    assert!(!h.session("key1").reconnect_pending());
}

#[tokio::test(start_paused = true)]
async fn test_remote_close_reconnects_once_after_delay() {
    let mut h = Harness::new(vec![]);
    h.appear_ticker("key1", "{}").await;
    let generation = h.session("key1").generation;

    h.provider.close_remote(TICKER);
    h.settle().await;
    assert!(h.session("key1").reconnect_pending());
    assert_eq!(h.session("key1").connections().len(), 1);

    // A second close while the timer is pending does not add another one.
    h.provider.close_remote(KLINE);
    h.settle().await;
    assert!(h.session("key1").connections().is_empty());

    h.wait(Duration::from_secs(4)).await;
    assert_eq!(h.provider.subscriptions().len(), 2);

    h.wait(Duration::from_secs(2)).await;
    assert_eq!(h.provider.count(TICKER), 2);
    assert_eq!(h.provider.count(KLINE), 2);
    assert!(h.session("key1").generation > generation);
    assert!(!h.session("key1").reconnect_pending());

    // Reconnect-driven cycles keep the window and do not backfill again.
    assert_eq!(h.history.calls().len(), 1);

    h.wait(Duration::from_secs(30)).await;
    assert_eq!(h.provider.subscriptions().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_stale_backfill_is_ignored() {
    let mut h = Harness::new(vec![1.0, 2.0, 3.0]);
    h.appear_ticker("key1", "{}").await;
    assert_eq!(h.session("key1").window.snapshot(), vec![1.0, 2.0, 3.0]);
    let images = h.host.images().len();

    let slot = SlotId::from("key1");
    let old = h.session("key1").generation.saturating_sub(1);
    h.engine.dispatch(EngineEvent::BackfillDone {
        slot,
        generation: old,
        result: Ok(vec![9.0; 24]),
    });
    h.settle().await;

    assert_eq!(h.session("key1").window.snapshot(), vec![1.0, 2.0, 3.0]);
    assert_eq!(h.host.images().len(), images);
}

#[tokio::test(start_paused = true)]
async fn test_manual_refresh() {
    let mut h = Harness::new(vec![5.0, 6.0]);
    h.appear_ticker("key1", "{}").await;
    let generation = h.session("key1").generation;

    h.host_event(r#"{"event":"keyUp","context":"key1","payload":{}}"#).await;

    assert!(h.session("key1").generation > generation);
    assert_eq!(h.provider.subscriptions().len(), 4);
    assert_eq!(h.history.calls().len(), 2);
    assert!(h.host.titles().iter().any(|t| t == "Refreshing…"));
    assert!(h
        .host
        .commands()
        .iter()
        .any(|c| matches!(c, HostCommand::ShowOk { .. })));
    // The refreshed backfill pushed a new image and cleared the title.
    assert_eq!(h.host.titles().last().map(String::as_str), Some(""));
}

#[tokio::test(start_paused = true)]
async fn test_depth_slot() {
    let mut h = Harness::new(vec![]);
    h.host_event(
        r#"{"event":"willAppear","action":"com.hotspot.binance.depth","context":"d1","payload":{"settings":{"symbol":"btcusdt","depthLevel":5}}}"#,
    )
    .await;

    assert_eq!(h.provider.subscriptions(), vec!["btcusdt@depth5".to_string()]);
    assert!(h.history.calls().is_empty());

    h.provider.text(
        "btcusdt@depth5",
        r#"{"lastUpdateId":1,"bids":[["50000","3"]],"asks":[["50001","7"]]}"#,
    );
    h.settle().await;
    assert_eq!(h.host.last_image().summary, "BTC ask $50001 bid $50000 30%/70%");

    // Depth level changes resubscribe.
    h.host_event(
        r#"{"event":"sendToPlugin","context":"d1","payload":{"action":"changeDepthLevel","depthLevel":20}}"#,
    )
    .await;
    assert_eq!(h.provider.count("btcusdt@depth20"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_two_slots_are_independent() {
    let mut h = Harness::new(vec![]);
    h.appear_ticker("a", r#"{"symbol":"btcusdt"}"#).await;
    h.appear_ticker("b", r#"{"symbol":"ethusdt"}"#).await;
    assert_eq!(h.engine.registry().len(), 2);

    h.host_event(r#"{"event":"willDisappear","context":"a"}"#).await;
    assert_eq!(h.engine.registry().len(), 1);
    assert_eq!(h.session("b").connections().len(), 2);
}
