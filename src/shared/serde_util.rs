//! Custom serde helpers for exchange wire formats.

/// Deserializes a Unix-millis `u64` into `DateTime<Utc>`.
///
/// Stream events carry their event time (`E`) and candle open time (`t`) as epoch
/// milliseconds, not ISO 8601 strings.
pub mod timestamp_ms {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        DateTime::<Utc>::from_timestamp_millis(millis as i64)
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid timestamp: {}", millis)))
    }
}

/// Deserializes a decimal string (`"50500.01"`) into `f64`.
///
/// The exchange quotes every price and percentage as a string to avoid float
/// rounding on its side; plain JSON numbers are accepted too.
pub mod f64_str {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(f64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match Raw::deserialize(deserializer)? {
            Raw::Str(s) => s.trim().parse::<f64>().ok(),
            Raw::Num(n) => Some(n),
        };
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| serde::de::Error::custom("expected a finite decimal number"))
    }
}
