//! Wire types for the ticker and kline streams (WS) and historical klines (REST).

use crate::error::ParseError;
use crate::shared::serde_util::{f64_str, timestamp_ms};
use crate::shared::{Interval, Symbol};
use chrono::{DateTime, Utc};
use serde::Deserialize;

// ─── WS wire types ───────────────────────────────────────────────────────────

/// `<symbol>@ticker`: rolling 24h statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct WsTicker {
    #[serde(rename = "E", with = "timestamp_ms")]
    pub event_time: DateTime<Utc>,
    #[serde(rename = "s")]
    pub symbol: Symbol,
    /// Last price.
    #[serde(rename = "c", with = "f64_str")]
    pub last_price: f64,
    /// Price change percent over 24h.
    #[serde(rename = "P", with = "f64_str")]
    pub change_pct: f64,
}

/// `<symbol>@kline_<interval>` event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WsKlineEvent {
    #[serde(rename = "E", with = "timestamp_ms")]
    pub event_time: DateTime<Utc>,
    #[serde(rename = "s")]
    pub symbol: Symbol,
    #[serde(rename = "k")]
    pub kline: WsKline,
}

/// The candle inside a kline event.
#[derive(Debug, Clone, Deserialize)]
pub struct WsKline {
    #[serde(rename = "t", with = "timestamp_ms")]
    pub open_time: DateTime<Utc>,
    #[serde(rename = "i")]
    pub interval: Interval,
    #[serde(rename = "c", with = "f64_str")]
    pub close: f64,
    /// True once the candle has closed; earlier updates are in-progress.
    #[serde(rename = "x")]
    pub is_closed: bool,
}

// ─── REST wire types ─────────────────────────────────────────────────────────

/// One `/api/v3/klines` row:
/// `[openTime, "open", "high", "low", "close", "volume", closeTime, ...]`.
pub type KlineRow = Vec<serde_json::Value>;

/// Column of the close price in a `/api/v3/klines` row.
const CLOSE_COLUMN: usize = 4;

/// Extract close prices, oldest first, from a `/api/v3/klines` response.
pub fn closes_from_rows(rows: &[KlineRow]) -> Result<Vec<f64>, ParseError> {
    rows.iter()
        .map(|row| {
            let cell = row.get(CLOSE_COLUMN).ok_or_else(|| ParseError::Number {
                what: "kline row",
                value: format!("{} columns", row.len()),
            })?;
            let parsed = match cell {
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
                serde_json::Value::Number(n) => n.as_f64(),
                _ => None,
            };
            parsed
                .filter(|v| v.is_finite())
                .ok_or_else(|| ParseError::Number {
                    what: "kline close",
                    value: cell.to_string(),
                })
        })
        .collect()
}
