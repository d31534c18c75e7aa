//! Number formatting for the key face.
//!
//! The policy is fixed: prices pick their decimal places from their magnitude,
//! percentages always show two decimals with an explicit sign. Rounding is half away
//! from zero so the key shows what a trader would write down, not banker's rounding.

/// Glyph shown next to a non-negative change.
pub const UP_GLYPH: char = '▲';
/// Glyph shown next to a negative change.
pub const DOWN_GLYPH: char = '▼';

/// Decimal places used for a price of this magnitude.
pub fn price_decimals(price: f64) -> usize {
    let abs_value = price.abs();

    if abs_value >= 1000.0 {
        return 0;
    }

    if abs_value >= 1.0 {
        return 2;
    }

    4
}

/// Round half away from zero to `decimals` places.
fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Format a price without currency sign: `1234.5` → `"1235"`, `42.567` → `"42.57"`.
pub fn format_price(price: f64) -> String {
    let decimals = price_decimals(price);
    format!("{:.1$}", round_to(price, decimals), decimals)
}

/// Price as displayed on the key: `"$50500"`.
pub fn display_price(price: f64) -> String {
    format!("${}", format_price(price))
}

/// Whether a change counts as "up". Zero is up.
pub fn is_up(change_pct: f64) -> bool {
    change_pct >= 0.0
}

/// Direction glyph for a percent change.
pub fn direction_glyph(change_pct: f64) -> char {
    if is_up(change_pct) {
        UP_GLYPH
    } else {
        DOWN_GLYPH
    }
}

/// Signed percentage with two decimals: `-1.2345` → `"-1.23%"`, `0` → `"+0.00%"`.
pub fn format_change(change_pct: f64) -> String {
    let sign = if is_up(change_pct) { '+' } else { '-' };
    format!("{}{:.2}%", sign, round_to(change_pct.abs(), 2))
}

/// Glyph followed by the signed percentage: `"▲+1.00%"`.
pub fn display_change(change_pct: f64) -> String {
    format!("{}{}", direction_glyph(change_pct), format_change(change_pct))
}

/// Whole-number share of a bar: `0.3` → `"30%"`.
pub fn format_share(ratio: f64) -> String {
    format!("{:.0}%", round_to(ratio * 100.0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_large_has_no_decimals() {
        assert_eq!(format_price(1234.5), "1235");
        assert_eq!(format_price(1000.0), "1000");
        assert_eq!(format_price(50500.0), "50500");
        assert_eq!(format_price(98765.4321), "98765");
    }

    #[test]
    fn test_price_medium_has_two_decimals() {
        assert_eq!(format_price(42.567), "42.57");
        assert_eq!(format_price(1.0), "1.00");
        assert_eq!(format_price(999.994), "999.99");
    }

    #[test]
    fn test_price_small_has_four_decimals() {
        assert_eq!(format_price(0.00321), "0.0032");
        assert_eq!(format_price(0.5), "0.5000");
        assert_eq!(format_price(0.0), "0.0000");
    }

    #[test]
    fn test_display_price_prefix() {
        assert_eq!(display_price(50500.0), "$50500");
        assert_eq!(display_price(0.00321), "$0.0032");
    }

    #[test]
    fn test_change_negative() {
        assert_eq!(format_change(-1.2345), "-1.23%");
        assert_eq!(direction_glyph(-1.2345), DOWN_GLYPH);
        assert_eq!(display_change(-1.2345), "▼-1.23%");
    }

    #[test]
    fn test_change_zero_is_up() {
        assert_eq!(format_change(0.0), "+0.00%");
        assert_eq!(direction_glyph(0.0), UP_GLYPH);
        assert_eq!(display_change(1.0), "▲+1.00%");
    }

    #[test]
    fn test_change_tiny_negative_keeps_sign() {
        assert_eq!(format_change(-0.001), "-0.00%");
        assert!(!is_up(-0.001));
    }

    #[test]
    fn test_format_share() {
        assert_eq!(format_share(0.3), "30%");
        assert_eq!(format_share(0.125), "13%");
        assert_eq!(format_share(1.0), "100%");
    }
}
