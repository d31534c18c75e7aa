//! Wire types for the partial book depth stream (WS).

use rust_decimal::Decimal;
use serde::Deserialize;

/// `<symbol>@depth<levels>`: the top N levels per side, sent in full every update.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WsPartialDepth {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    /// `[price, quantity]` pairs as decimal strings.
    #[serde(default = "Vec::new")]
    pub bids: Vec<(Decimal, Decimal)>,
    #[serde(default = "Vec::new")]
    pub asks: Vec<(Decimal, Decimal)>,
}
