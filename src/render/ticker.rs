//! Ticker key face: label, price, 24h change, and the closed-candle sparkline.

use super::svg::{Anchor, SvgCanvas, TextStyle};
use super::{Artifact, BACKGROUND, DOWN, KEY_SIZE, MUTED, TEXT, UP};
use crate::domain::settings::Opacity;
use crate::domain::ticker::TickerQuote;
use crate::shared::fmt::num::{display_change, display_price, is_up};
use crate::shared::Symbol;

/// Placeholder for values not received yet.
const MISSING: &str = "--";

/// Chart area of the sparkline.
const CHART_LEFT: f64 = 8.0;
const CHART_RIGHT: f64 = KEY_SIZE - 8.0;
const CHART_TOP: f64 = 88.0;
const CHART_BOTTOM: f64 = KEY_SIZE - 8.0;

/// Everything the ticker face depends on.
#[derive(Debug, Clone, Copy)]
pub struct TickerView<'a> {
    pub symbol: &'a Symbol,
    pub quote: Option<TickerQuote>,
    /// Rolling window, oldest first.
    pub samples: &'a [f64],
    pub opacity: Opacity,
}

pub fn render_ticker(view: &TickerView<'_>) -> Artifact {
    let label = view.symbol.base_label();
    let price = view
        .quote
        .map(|q| display_price(q.price))
        .unwrap_or_else(|| MISSING.to_string());
    let change = view
        .quote
        .map(|q| display_change(q.change_pct))
        .unwrap_or_else(|| MISSING.to_string());
    let trend = match view.quote {
        Some(q) if is_up(q.change_pct) => UP,
        Some(_) => DOWN,
        None => MUTED,
    };

    let mut canvas = SvgCanvas::new(KEY_SIZE, KEY_SIZE);
    canvas.begin_frame(BACKGROUND, view.opacity.fraction());

    let points = sparkline_points(view.samples);
    if points.len() >= 2 {
        canvas.fill_area("spark", &points, CHART_BOTTOM, trend);
        canvas.draw_polyline(&points, trend, 2.0);
    }

    let center = KEY_SIZE / 2.0;
    canvas.text(center, 28.0, label, TextStyle {
        size: 20.0,
        color: TEXT,
        bold: true,
        anchor: Anchor::Middle,
    });
    canvas.text(center, 56.0, &price, TextStyle {
        size: 24.0,
        color: TEXT,
        bold: true,
        anchor: Anchor::Middle,
    });
    canvas.text(center, 80.0, &change, TextStyle {
        size: 17.0,
        color: trend,
        bold: false,
        anchor: Anchor::Middle,
    });

    Artifact {
        svg: canvas.finish(),
        summary: format!("{} {} {}", label, price, change),
    }
}

/// Min–max normalised sparkline inside the chart area. A flat series sits on the
/// vertical middle; fewer than two samples draw nothing.
pub fn sparkline_points(samples: &[f64]) -> Vec<(f64, f64)> {
    if samples.len() < 2 {
        return Vec::new();
    }
    let (lo, hi) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = hi - lo;
    let step = (CHART_RIGHT - CHART_LEFT) / (samples.len() - 1) as f64;
    let height = CHART_BOTTOM - CHART_TOP;

    samples
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let norm = if range > f64::EPSILON { (v - lo) / range } else { 0.5 };
            (CHART_LEFT + step * i as f64, CHART_BOTTOM - norm * height)
        })
        .collect()
}
