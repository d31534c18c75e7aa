//! Historical backfill: one-shot close-price history for the rolling window.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::settings::WindowPreset;
use crate::error::HttpError;
use crate::session::{EngineEvent, Generation};
use crate::shared::{Interval, SlotId, Symbol};

/// Source of historical close prices.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// The most recent `limit` close prices, oldest first.
    async fn closes(&self, symbol: &Symbol, interval: Interval, limit: usize) -> Result<Vec<f64>, HttpError>;
}

#[cfg(feature = "http")]
#[async_trait]
impl HistorySource for crate::http::BinanceHttp {
    async fn closes(&self, symbol: &Symbol, interval: Interval, limit: usize) -> Result<Vec<f64>, HttpError> {
        let rows = self.get_klines(symbol, interval, limit).await?;
        crate::domain::ticker::wire::closes_from_rows(&rows)
            .map_err(|e| HttpError::UnexpectedResponse(e.to_string()))
    }
}

/// Fetch in the background and post the result as [`EngineEvent::BackfillDone`].
pub(crate) fn spawn_backfill(
    history: Arc<dyn HistorySource>,
    slot: SlotId,
    generation: Generation,
    symbol: Symbol,
    preset: WindowPreset,
    events: mpsc::UnboundedSender<EngineEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!(
            slot = %slot,
            generation,
            symbol = %symbol,
            interval = %preset.interval,
            limit = preset.capacity,
            "Backfilling window"
        );
        let result = history.closes(&symbol, preset.interval, preset.capacity).await;
        let _ = events.send(EngineEvent::BackfillDone {
            slot,
            generation,
            result,
        });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::ChartRange;

    struct Failing;

    #[async_trait]
    impl HistorySource for Failing {
        async fn closes(&self, _: &Symbol, _: Interval, _: usize) -> Result<Vec<f64>, HttpError> {
            Err(HttpError::ServerError {
                status: 503,
                body: "unavailable".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_failure_is_posted_with_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_backfill(
            Arc::new(Failing),
            SlotId::from("ctx"),
            4,
            Symbol::new("BTCUSDT"),
            ChartRange::Day7.preset(),
            tx,
        );
        match rx.recv().await {
            Some(EngineEvent::BackfillDone {
                slot,
                generation,
                result,
            }) => {
                assert_eq!(slot.as_str(), "ctx");
                assert_eq!(generation, 4);
                assert!(matches!(result, Err(HttpError::ServerError { status: 503, .. })));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
