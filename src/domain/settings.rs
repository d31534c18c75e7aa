//! Per-slot settings: what the host persists, what the settings UI sends, and how a
//! change is classified (stream-affecting vs cosmetic).

use crate::shared::{Interval, Symbol};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ─── FeedKind ────────────────────────────────────────────────────────────────

/// Which live streams a slot subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// 24h ticker plus closed klines feeding the sparkline.
    TickerKline,
    /// Partial order book (top N levels).
    Depth,
}

impl FeedKind {
    /// Derive the kind from the host action UUID (`com.example.binance.depth`).
    pub fn from_action(action_uuid: &str) -> Self {
        if action_uuid.ends_with(".depth") {
            FeedKind::Depth
        } else {
            FeedKind::TickerKline
        }
    }

    pub fn uses_window(&self) -> bool {
        matches!(self, FeedKind::TickerKline)
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedKind::TickerKline => write!(f, "ticker+kline"),
            FeedKind::Depth => write!(f, "depth"),
        }
    }
}

// ─── ChartRange ──────────────────────────────────────────────────────────────

/// Sampling preset for the rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPreset {
    pub interval: Interval,
    pub capacity: usize,
}

/// Symbolic chart range picked in the settings UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChartRange {
    Hour1,
    #[default]
    Hour6,
    Hour24,
    Day7,
    Day30,
}

impl ChartRange {
    /// Parse a range key. Unknown keys fall back to the 6h preset.
    pub fn from_key(key: &str) -> Self {
        match key.trim() {
            "1h" => Self::Hour1,
            "6h" => Self::Hour6,
            "24h" => Self::Hour24,
            "7d" => Self::Day7,
            "30d" => Self::Day30,
            other => {
                tracing::debug!(key = other, "Unknown chart range, using 6h");
                Self::Hour6
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour1 => "1h",
            Self::Hour6 => "6h",
            Self::Hour24 => "24h",
            Self::Day7 => "7d",
            Self::Day30 => "30d",
        }
    }

    /// Candle interval and sample count covering this range.
    pub fn preset(&self) -> WindowPreset {
        let (interval, capacity) = match self {
            Self::Hour1 => (Interval::Minute5, 12),
            Self::Hour6 => (Interval::Minute15, 24),
            Self::Hour24 => (Interval::Hour1, 24),
            Self::Day7 => (Interval::Hour8, 21),
            Self::Day30 => (Interval::Day1, 30),
        };
        WindowPreset { interval, capacity }
    }
}

impl Serialize for ChartRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChartRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Ok(ChartRange::from_key(&key))
    }
}

// ─── DepthLevel ──────────────────────────────────────────────────────────────

/// Number of book levels per side. The exchange only offers 5, 10 and 20.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DepthLevel {
    Five,
    #[default]
    Ten,
    Twenty,
}

impl DepthLevel {
    /// Map a level count; unsupported counts fall back to 10.
    pub fn from_count(count: u64) -> Self {
        match count {
            5 => Self::Five,
            10 => Self::Ten,
            20 => Self::Twenty,
            other => {
                tracing::debug!(level = other, "Unsupported depth level, using 10");
                Self::Ten
            }
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            Self::Five => 5,
            Self::Ten => 10,
            Self::Twenty => 20,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Num(f64),
    Str(String),
}

impl NumberOrString {
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrString::Num(n) => Some(*n),
            NumberOrString::Str(s) => s.trim().parse::<f64>().ok(),
        }
        .filter(|v| v.is_finite())
    }
}

impl Serialize for DepthLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.count())
    }
}

impl<'de> Deserialize<'de> for DepthLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = NumberOrString::deserialize(deserializer)?;
        Ok(raw
            .as_f64()
            .filter(|v| *v >= 0.0)
            .map(|v| DepthLevel::from_count(v as u64))
            .unwrap_or_default())
    }
}

// ─── Opacity ─────────────────────────────────────────────────────────────────

/// Background opacity in percent, always within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opacity(u8);

impl Opacity {
    pub fn new(percent: i64) -> Self {
        Self(percent.clamp(0, 100) as u8)
    }

    pub fn percent(&self) -> u8 {
        self.0
    }

    /// Opacity as an SVG `fill-opacity` fraction.
    pub fn fraction(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self(100)
    }
}

impl Serialize for Opacity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for Opacity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = NumberOrString::deserialize(deserializer)?;
        raw.as_f64()
            .map(|v| Opacity::new(v.round() as i64))
            .ok_or_else(|| serde::de::Error::custom("bgOpacity must be a number"))
    }
}

// ─── SlotSettings ────────────────────────────────────────────────────────────

/// Full, normalized settings of one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotSettings {
    pub symbol: Symbol,
    pub chart_range: ChartRange,
    pub depth_level: DepthLevel,
    pub bg_opacity: Opacity,
}

/// How a settings change affects a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsChange {
    Unchanged,
    /// Only render parameters differ; redraw in place.
    Cosmetic,
    /// The subscribed streams differ; reconnect.
    Stream,
}

impl SlotSettings {
    /// Apply a partial update. Empty symbols are ignored.
    pub fn merged(&self, patch: &SettingsPatch) -> SlotSettings {
        let mut next = self.clone();
        if let Some(symbol) = patch.symbol.as_ref().filter(|s| !s.as_str().is_empty()) {
            next.symbol = symbol.clone();
        }
        if let Some(range) = patch.chart_range {
            next.chart_range = range;
        }
        if let Some(level) = patch.depth_level {
            next.depth_level = level;
        }
        if let Some(opacity) = patch.bg_opacity {
            next.bg_opacity = opacity;
        }
        next
    }

    /// Classify the difference between `self` (live) and `next` for a feed kind.
    pub fn classify(&self, next: &SlotSettings, kind: FeedKind) -> SettingsChange {
        let stream_changed = self.symbol != next.symbol
            || match kind {
                FeedKind::TickerKline => self.chart_range != next.chart_range,
                FeedKind::Depth => self.depth_level != next.depth_level,
            };

        if stream_changed {
            SettingsChange::Stream
        } else if self != next {
            SettingsChange::Cosmetic
        } else {
            SettingsChange::Unchanged
        }
    }

    /// The settings object handed back to the host for persistence.
    pub fn persisted(&self, kind: FeedKind) -> PersistedSettings {
        PersistedSettings {
            symbol: self.symbol.clone(),
            chart_range: kind.uses_window().then_some(self.chart_range),
            depth_level: (kind == FeedKind::Depth).then_some(self.depth_level),
            bg_opacity: self.bg_opacity,
        }
    }
}

/// Wire shape of persisted settings (`{symbol, chartRange|depthLevel, bgOpacity}`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSettings {
    pub symbol: Symbol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_range: Option<ChartRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_level: Option<DepthLevel>,
    pub bg_opacity: Opacity,
}

/// A partial settings object as sent by the host or built from a UI action.
///
/// Unknown fields are ignored so host-side additions never break decoding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default)]
    pub symbol: Option<Symbol>,
    #[serde(default)]
    pub chart_range: Option<ChartRange>,
    #[serde(default)]
    pub depth_level: Option<DepthLevel>,
    #[serde(default, deserialize_with = "lenient_opacity")]
    pub bg_opacity: Option<Opacity>,
}

/// A malformed opacity in stored settings is treated as absent rather than
/// rejecting the whole settings object.
fn lenient_opacity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Opacity>, D::Error> {
    let raw = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|r| r.as_f64())
        .map(|v| Opacity::new(v.round() as i64)))
}

// ─── UserAction ──────────────────────────────────────────────────────────────

/// Structured messages from the settings UI (`sendToPlugin` payloads).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action")]
pub enum UserAction {
    #[serde(rename = "changeSymbol")]
    ChangeSymbol { symbol: Symbol },
    #[serde(rename = "changeChartRange")]
    ChangeChartRange {
        #[serde(alias = "chartRange")]
        value: ChartRange,
    },
    #[serde(rename = "changeDepthLevel")]
    ChangeDepthLevel {
        #[serde(alias = "depthLevel")]
        value: DepthLevel,
    },
    #[serde(rename = "changeBgOpacity")]
    ChangeOpacity {
        #[serde(rename = "bgOpacity")]
        bg_opacity: Opacity,
    },
}

impl UserAction {
    pub fn into_patch(self) -> SettingsPatch {
        match self {
            UserAction::ChangeSymbol { symbol } => SettingsPatch {
                symbol: Some(symbol),
                ..Default::default()
            },
            UserAction::ChangeChartRange { value } => SettingsPatch {
                chart_range: Some(value),
                ..Default::default()
            },
            UserAction::ChangeDepthLevel { value } => SettingsPatch {
                depth_level: Some(value),
                ..Default::default()
            },
            UserAction::ChangeOpacity { bg_opacity } => SettingsPatch {
                bg_opacity: Some(bg_opacity),
                ..Default::default()
            },
        }
    }
}
