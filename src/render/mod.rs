//! Renderer: pure functions from session state to a key image.
//!
//! Nothing here performs I/O. The same input always produces the same bytes.

pub mod depth;
pub mod svg;
pub mod ticker;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

pub use depth::{render_depth, DepthView, PressureBar};
pub use ticker::{render_ticker, TickerView};

/// Side length of a key image, in pixels.
pub const KEY_SIZE: f64 = 144.0;

// ─── Palette ─────────────────────────────────────────────────────────────────

pub(crate) const BACKGROUND: &str = "#0B0E11";
pub(crate) const TEXT: &str = "#EAECEF";
pub(crate) const MUTED: &str = "#848E9C";
pub(crate) const UP: &str = "#0ECB81";
pub(crate) const DOWN: &str = "#F6465D";

/// A rendered key face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Complete SVG document.
    pub svg: String,
    /// One-line plain-text rendition, for logs.
    pub summary: String,
}

impl Artifact {
    /// `data:image/svg+xml;base64,…` as accepted by the host's `setImage`.
    pub fn to_data_url(&self) -> String {
        format!("data:image/svg+xml;base64,{}", STANDARD.encode(self.svg.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        let a = Artifact {
            svg: "<svg/>".into(),
            summary: String::new(),
        };
        assert_eq!(a.to_data_url(), "data:image/svg+xml;base64,PHN2Zy8+");
    }
}
