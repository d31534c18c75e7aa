//! Ticker domain: last price, 24h change, and the closed-candle sparkline feed.

pub mod wire;

use wire::{WsKlineEvent, WsTicker};

/// Latest price and 24h percent change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickerQuote {
    pub price: f64,
    pub change_pct: f64,
}

impl From<&WsTicker> for TickerQuote {
    fn from(t: &WsTicker) -> Self {
        Self {
            price: t.last_price,
            change_pct: t.change_pct,
        }
    }
}

/// Ticker half of a session snapshot. The rolling window lives next to it in the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerSnapshot {
    pub quote: Option<TickerQuote>,
}

impl TickerSnapshot {
    pub fn apply_ticker(&mut self, ticker: &WsTicker) {
        self.quote = Some(TickerQuote::from(ticker));
    }
}

/// Close price of a finished candle; `None` while the candle is still forming.
pub fn closed_price(event: &WsKlineEvent) -> Option<f64> {
    event.kline.is_closed.then_some(event.kline.close)
}
