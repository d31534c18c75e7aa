//! Minimal SVG canvas.
//!
//! Coordinates are always written with one decimal so identical input renders to
//! identical bytes.

use std::fmt::Write;

/// Text anchor for [`SvgCanvas::text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// Font settings for one text element.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle<'a> {
    pub size: f64,
    pub color: &'a str,
    pub bold: bool,
    pub anchor: Anchor,
}

/// An SVG document under construction.
pub struct SvgCanvas {
    width: f64,
    height: f64,
    defs: String,
    body: String,
}

impl SvgCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            defs: String::new(),
            body: String::new(),
        }
    }

    /// Fill the whole canvas.
    pub fn begin_frame(&mut self, clear_color: &str, opacity: f64) {
        let (w, h) = (self.width, self.height);
        self.fill_rect(0.0, 0.0, w, h, clear_color, opacity);
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str, opacity: f64) {
        let _ = write!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" fill-opacity="{}"/>"#,
            num(x),
            num(y),
            num(w.max(0.0)),
            num(h.max(0.0)),
            escape(color),
            ratio(opacity)
        );
    }

    pub fn draw_polyline(&mut self, points: &[(f64, f64)], color: &str, width: f64) {
        if points.len() < 2 {
            return;
        }
        let _ = write!(
            self.body,
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linejoin="round" stroke-linecap="round"/>"#,
            point_list(points),
            escape(color),
            num(width)
        );
    }

    /// Area between a line and `baseline_y`, filled with a vertical gradient that
    /// fades from `color` to transparent.
    pub fn fill_area(&mut self, id: &str, points: &[(f64, f64)], baseline_y: f64, color: &str) {
        if points.len() < 2 {
            return;
        }
        let id = escape(id);
        let color = escape(color);
        let _ = write!(
            self.defs,
            r#"<linearGradient id="{id}" x1="0" y1="0" x2="0" y2="1"><stop offset="0" stop-color="{color}" stop-opacity="0.35"/><stop offset="1" stop-color="{color}" stop-opacity="0"/></linearGradient>"#
        );

        let mut outline = Vec::with_capacity(points.len() + 2);
        outline.extend_from_slice(points);
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            outline.push((last.0, baseline_y));
            outline.push((first.0, baseline_y));
        }
        let _ = write!(
            self.body,
            r#"<polygon points="{}" fill="url(#{})" stroke="none"/>"#,
            point_list(&outline),
            id
        );
    }

    pub fn text(&mut self, x: f64, y: f64, content: &str, style: TextStyle<'_>) {
        let _ = write!(
            self.body,
            r#"<text x="{}" y="{}" font-family="Arial, Helvetica, sans-serif" font-size="{}" font-weight="{}" fill="{}" text-anchor="{}">{}</text>"#,
            num(x),
            num(y),
            num(style.size),
            if style.bold { "bold" } else { "normal" },
            escape(style.color),
            style.anchor.as_str(),
            escape(content)
        );
    }

    pub fn finish(self) -> String {
        let mut out = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = num(self.width),
            h = num(self.height)
        );
        if !self.defs.is_empty() {
            out.push_str("<defs>");
            out.push_str(&self.defs);
            out.push_str("</defs>");
        }
        out.push_str(&self.body);
        out.push_str("</svg>");
        out
    }
}

/// One-decimal coordinate. Negative zero prints as `0.0`.
pub fn num(v: f64) -> String {
    let v = if v.is_finite() { v } else { 0.0 };
    let rounded = (v * 10.0).round() / 10.0;
    if rounded == 0.0 {
        "0.0".to_string()
    } else {
        format!("{:.1}", rounded)
    }
}

fn ratio(v: f64) -> String {
    format!("{:.2}", v.clamp(0.0, 1.0))
}

fn point_list(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{},{}", num(*x), num(*y)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape text for use in XML content and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_is_fixed_one_decimal() {
        assert_eq!(num(1.0), "1.0");
        assert_eq!(num(12.345), "12.3");
        assert_eq!(num(-0.04), "0.0");
        assert_eq!(num(f64::NAN), "0.0");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }

    #[test]
    fn test_polyline_needs_two_points() {
        let mut c = SvgCanvas::new(10.0, 10.0);
        c.draw_polyline(&[(1.0, 1.0)], "#fff", 1.0);
        assert!(!c.finish().contains("polyline"));
    }

    #[test]
    fn test_document_shape() {
        let mut c = SvgCanvas::new(144.0, 144.0);
        c.begin_frame("#000000", 0.5);
        c.fill_area("g", &[(0.0, 10.0), (10.0, 0.0)], 20.0, "#0ECB81");
        c.text(5.0, 5.0, "A<B", TextStyle {
            size: 12.0,
            color: "#FFFFFF",
            bold: true,
            anchor: Anchor::Middle,
        });
        let svg = c.finish();
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="144.0""#));
        assert!(svg.contains(r#"fill-opacity="0.50""#));
        assert!(svg.contains("<defs><linearGradient id=\"g\""));
        assert!(svg.contains("points=\"0.0,10.0 10.0,0.0 10.0,20.0 0.0,20.0\""));
        assert!(svg.contains(">A&lt;B</text>"));
        assert!(svg.ends_with("</svg>"));
    }
}
