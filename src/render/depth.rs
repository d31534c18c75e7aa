//! Depth key face: best bid/ask and a bid/ask pressure bar.

use super::svg::{Anchor, SvgCanvas, TextStyle};
use super::{Artifact, BACKGROUND, DOWN, KEY_SIZE, MUTED, TEXT, UP};
use crate::domain::depth::DepthBook;
use crate::domain::settings::{DepthLevel, Opacity};
use crate::shared::fmt::num::{display_price, format_share};
use crate::shared::Symbol;
use rust_decimal::prelude::ToPrimitive;

/// Segments narrower than this share of the bar get no percentage label.
pub const MIN_LABEL_SHARE: f64 = 0.2;
/// Largest bid share that still leaves the ask segment wide enough for a label.
pub const MAX_BID_FOR_ASK_LABEL: f64 = 0.8;

const BAR_LEFT: f64 = 8.0;
const BAR_WIDTH: f64 = KEY_SIZE - 16.0;
const BAR_TOP: f64 = 100.0;
const BAR_HEIGHT: f64 = 26.0;

const LOADING: &str = "Loading…";

/// Everything the depth face depends on.
#[derive(Debug, Clone, Copy)]
pub struct DepthView<'a> {
    pub symbol: &'a Symbol,
    pub level: DepthLevel,
    pub book: &'a DepthBook,
    pub opacity: Opacity,
}

/// Horizontal split of the pressure bar.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureBar {
    pub bid_width: f64,
    pub ask_width: f64,
    pub bid_label: Option<String>,
    pub ask_label: Option<String>,
}

impl PressureBar {
    /// Split `width` at `bid_ratio` (clamped to 0..=1).
    pub fn layout(bid_ratio: f64, width: f64) -> Self {
        let bid = bid_ratio.clamp(0.0, 1.0);
        let ask = 1.0 - bid;
        Self {
            bid_width: width * bid,
            ask_width: width * ask,
            bid_label: (bid >= MIN_LABEL_SHARE).then(|| format_share(bid)),
            // Gate on the bid share: `1.0 - 0.8` is just below 0.2 in f64.
            ask_label: (bid <= MAX_BID_FOR_ASK_LABEL).then(|| format_share(ask)),
        }
    }
}

pub fn render_depth(view: &DepthView<'_>) -> Artifact {
    let label = view.symbol.base_label();
    let best_ask = price_line(view.book.best_ask().and_then(|p| p.to_f64()));
    let best_bid = price_line(view.book.best_bid().and_then(|p| p.to_f64()));

    let mut canvas = SvgCanvas::new(KEY_SIZE, KEY_SIZE);
    canvas.begin_frame(BACKGROUND, view.opacity.fraction());

    let center = KEY_SIZE / 2.0;
    canvas.text(center, 26.0, label, TextStyle {
        size: 20.0,
        color: TEXT,
        bold: true,
        anchor: Anchor::Middle,
    });
    canvas.text(KEY_SIZE - 6.0, 14.0, &format!("L{}", view.level.count()), TextStyle {
        size: 10.0,
        color: MUTED,
        bold: false,
        anchor: Anchor::End,
    });
    canvas.text(center, 56.0, &best_ask, TextStyle {
        size: 18.0,
        color: DOWN,
        bold: true,
        anchor: Anchor::Middle,
    });
    canvas.text(center, 84.0, &best_bid, TextStyle {
        size: 18.0,
        color: UP,
        bold: true,
        anchor: Anchor::Middle,
    });

    let summary = match view.book.bid_ratio() {
        Some(ratio) => {
            let bar = PressureBar::layout(ratio, BAR_WIDTH);
            draw_bar(&mut canvas, &bar);
            format!(
                "{} ask {} bid {} {}/{}",
                label,
                best_ask,
                best_bid,
                format_share(ratio),
                format_share(1.0 - ratio)
            )
        }
        None => {
            canvas.fill_rect(BAR_LEFT, BAR_TOP, BAR_WIDTH, BAR_HEIGHT, MUTED, 0.25);
            canvas.text(center, BAR_TOP + 18.0, LOADING, TextStyle {
                size: 14.0,
                color: MUTED,
                bold: false,
                anchor: Anchor::Middle,
            });
            format!("{} loading", label)
        }
    };

    Artifact {
        svg: canvas.finish(),
        summary,
    }
}

fn draw_bar(canvas: &mut SvgCanvas, bar: &PressureBar) {
    let ask_left = BAR_LEFT + bar.bid_width;
    canvas.fill_rect(BAR_LEFT, BAR_TOP, bar.bid_width, BAR_HEIGHT, UP, 1.0);
    canvas.fill_rect(ask_left, BAR_TOP, bar.ask_width, BAR_HEIGHT, DOWN, 1.0);

    let style = TextStyle {
        size: 13.0,
        color: TEXT,
        bold: true,
        anchor: Anchor::Middle,
    };
    let baseline = BAR_TOP + 18.0;
    if let Some(text) = &bar.bid_label {
        canvas.text(BAR_LEFT + bar.bid_width / 2.0, baseline, text, style);
    }
    if let Some(text) = &bar.ask_label {
        canvas.text(ask_left + bar.ask_width / 2.0, baseline, text, style);
    }
}

fn price_line(price: Option<f64>) -> String {
    price.map(display_price).unwrap_or_else(|| "--".to_string())
}
