//! Depth domain: top-of-book levels and the bid/ask pressure derived from them.

pub mod wire;

use rust_decimal::prelude::*;
use wire::WsPartialDepth;

/// One aggregated price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Current book levels, best first on both sides.
///
/// Every depth message carries the full top-N book, so updates replace the state
/// wholesale instead of merging deltas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthBook {
    pub last_update_id: u64,
    bids: Vec<Level>,
    asks: Vec<Level>,
}

impl DepthBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both sides from a partial depth message.
    pub fn apply(&mut self, depth: &WsPartialDepth) {
        self.last_update_id = depth.last_update_id;
        self.bids = to_levels(&depth.bids);
        self.asks = to_levels(&depth.asks);
        // Bids descending, asks ascending.
        self.bids.sort_by(|a, b| b.price.cmp(&a.price));
        self.asks.sort_by(|a, b| a.price.cmp(&b.price));
    }

    /// Bids sorted by price descending.
    pub fn bids(&self) -> &[Level] {
        &self.bids
    }

    /// Asks sorted by price ascending.
    pub fn asks(&self) -> &[Level] {
        &self.asks
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    pub fn total_bid_quantity(&self) -> Decimal {
        self.bids.iter().map(|l| l.quantity).sum()
    }

    pub fn total_ask_quantity(&self) -> Decimal {
        self.asks.iter().map(|l| l.quantity).sum()
    }

    /// Share of bid quantity in the whole visible book, `None` if a side is empty
    /// or the book holds no quantity at all.
    pub fn bid_ratio(&self) -> Option<f64> {
        if self.is_incomplete() {
            return None;
        }
        let bids = self.total_bid_quantity();
        let total = bids + self.total_ask_quantity();
        if total.is_zero() {
            return None;
        }
        (bids / total).to_f64()
    }

    /// Whether either side has no levels yet.
    pub fn is_incomplete(&self) -> bool {
        self.bids.is_empty() || self.asks.is_empty()
    }
}

fn to_levels(pairs: &[(Decimal, Decimal)]) -> Vec<Level> {
    pairs
        .iter()
        .map(|(price, quantity)| Level {
            price: *price,
            quantity: *quantity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(bids: Vec<(i64, i64)>, asks: Vec<(i64, i64)>) -> WsPartialDepth {
        let conv = |v: Vec<(i64, i64)>| -> Vec<(Decimal, Decimal)> {
            v.into_iter()
                .map(|(p, q)| (Decimal::from(p), Decimal::from(q)))
                .collect()
        };
        WsPartialDepth {
            last_update_id: 1,
            bids: conv(bids),
            asks: conv(asks),
        }
    }

    #[test]
    fn test_apply_replaces_and_sorts() {
        let mut book = DepthBook::new();
        book.apply(&depth(vec![(99, 1), (100, 2)], vec![(102, 1), (101, 3)]));
        assert_eq!(book.best_bid(), Some(Decimal::from(100)));
        assert_eq!(book.best_ask(), Some(Decimal::from(101)));

        book.apply(&depth(vec![(90, 5)], vec![(95, 5)]));
        assert_eq!(book.bids().len(), 1);
        assert_eq!(book.asks().len(), 1);
        assert_eq!(book.best_bid(), Some(Decimal::from(90)));
    }

    #[test]
    fn test_bid_ratio() {
        let mut book = DepthBook::new();
        book.apply(&depth(vec![(100, 10), (99, 20)], vec![(101, 70)]));
        assert_eq!(book.total_bid_quantity(), Decimal::from(30));
        let ratio = book.bid_ratio().unwrap();
        assert!((ratio - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_bid_ratio_none_when_side_empty() {
        let mut book = DepthBook::new();
        book.apply(&depth(vec![(100, 10)], vec![]));
        assert!(book.is_incomplete());
        assert_eq!(book.bid_ratio(), None);
    }
}
