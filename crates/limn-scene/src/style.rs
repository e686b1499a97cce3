//! Style normalization
//!
//! Total, pure mappings from host style values to the canonical wire
//! values the client understands:
//! - colors to lowercase `#rrggbb` or the `"none"` sentinel
//! - dash specifications to comma-joined integer strings
//! - marker symbols to a fixed shape set
//!
//! Unrecognized input never fails: it falls back to a documented
//! default and records a single [`Warning`](crate::error::Warning).

use serde::{Deserialize, Serialize};

use crate::error::Warnings;

/// The canonical dasharray for a solid stroke.
pub const SOLID_DASHARRAY: &str = "10,0";

/// A host color value.
///
/// Hosts hand colors over either as normalized float channels or as a
/// name/hex string; both normalize to the same canonical form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Color {
    /// No paint at all (e.g. an unfilled patch)
    None,

    /// RGB channels in 0.0..=1.0
    Rgb(f64, f64, f64),

    /// RGBA channels in 0.0..=1.0; alpha is carried separately on the
    /// wire, so only the color channels are encoded here
    Rgba(f64, f64, f64, f64),

    /// A name (`"red"`, matplotlib single letters) or `#rgb`/`#rrggbb`
    Named(String),
}

impl Color {
    /// Canonical lowercase `#rrggbb` encoding, or `"none"`.
    ///
    /// Unrecognized names fall back to black with one warning.
    pub fn to_hex(&self, warnings: &mut Warnings) -> String {
        match self {
            Color::None => "none".to_string(),
            Color::Rgb(r, g, b) => hex_from_channels(*r, *g, *b),
            Color::Rgba(r, g, b, _a) => hex_from_channels(*r, *g, *b),
            Color::Named(name) => named_to_hex(name, warnings),
        }
    }

    /// The alpha channel if this color carries one.
    pub fn alpha(&self) -> Option<f64> {
        match self {
            Color::Rgba(_, _, _, a) => Some(*a),
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::Named("black".to_string())
    }
}

fn channel(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn hex_from_channels(r: f64, g: f64, b: f64) -> String {
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}

fn named_to_hex(name: &str, warnings: &mut Warnings) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.as_str() {
        "" | "none" => return "none".to_string(),
        "b" | "blue" => return "#0000ff".to_string(),
        "g" | "green" => return "#008000".to_string(),
        "r" | "red" => return "#ff0000".to_string(),
        "c" | "cyan" => return "#00ffff".to_string(),
        "m" | "magenta" => return "#ff00ff".to_string(),
        "y" | "yellow" => return "#ffff00".to_string(),
        "k" | "black" => return "#000000".to_string(),
        "w" | "white" => return "#ffffff".to_string(),
        "gray" | "grey" => return "#808080".to_string(),
        _ => {}
    }

    if let Some(hex) = parse_hex(&lower) {
        return hex;
    }

    warnings.style_fallback(format!("color '{name}' not understood: defaulting to black"));
    "#000000".to_string()
}

fn parse_hex(s: &str) -> Option<String> {
    let digits = s.strip_prefix('#')?;
    let ok = |d: &str| d.chars().all(|c| c.is_ascii_hexdigit());
    match digits.len() {
        6 if ok(digits) => Some(format!("#{digits}")),
        // #rgb expands by doubling each digit
        3 if ok(digits) => {
            let mut out = String::with_capacity(7);
            out.push('#');
            for c in digits.chars() {
                out.push(c);
                out.push(c);
            }
            Some(out)
        }
        _ => None,
    }
}

/// A host dash specification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DashSpec {
    /// Named line style: `"solid"`/`"-"`, `"dashed"`/`"--"`,
    /// `"dashdot"`/`"-."`, `"dotted"`/`":"`, `"none"`
    Named(String),

    /// Explicit on/off pattern in points
    OnOff(Vec<f64>),
}

impl DashSpec {
    pub fn solid() -> Self {
        DashSpec::Named("solid".to_string())
    }

    /// Canonical comma-joined integer dasharray, or `"none"` for an
    /// invisible stroke. Unrecognized names fall back to the solid
    /// encoding with one warning.
    pub fn to_dasharray(&self, warnings: &mut Warnings) -> String {
        match self {
            DashSpec::OnOff(seq) if !seq.is_empty() => seq
                .iter()
                .map(|v| format!("{}", v.round() as i64))
                .collect::<Vec<_>>()
                .join(","),
            DashSpec::OnOff(_) => SOLID_DASHARRAY.to_string(),
            DashSpec::Named(name) => match name.trim() {
                "solid" | "-" => SOLID_DASHARRAY.to_string(),
                "dashed" | "--" => "6,6".to_string(),
                "dashdot" | "-." => "4,4,2,4".to_string(),
                "dotted" | ":" => "2,2".to_string(),
                "none" | "None" | "" | " " => "none".to_string(),
                other => {
                    warnings.style_fallback(format!(
                        "line style '{other}' not understood: defaulting to solid"
                    ));
                    SOLID_DASHARRAY.to_string()
                }
            },
        }
    }

    /// Whether this spec draws no stroke at all
    pub fn is_none(&self) -> bool {
        matches!(self, DashSpec::Named(n) if matches!(n.trim(), "none" | "None" | "" | " "))
    }
}

impl Default for DashSpec {
    fn default() -> Self {
        DashSpec::solid()
    }
}

/// The fixed marker shape set understood by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerShape {
    Circle,
    Square,
    Diamond,
    Cross,
    TriangleUp,
    TriangleDown,
    Star,
}

impl MarkerShape {
    /// Map a host marker symbol to a shape.
    ///
    /// Returns `None` for the explicit no-marker symbols; anything
    /// unrecognized falls back to a circle with one warning.
    pub fn from_symbol(symbol: &str, warnings: &mut Warnings) -> Option<MarkerShape> {
        match symbol.trim() {
            "" | "none" | "None" => None,
            "o" | "circle" => Some(MarkerShape::Circle),
            "s" | "square" => Some(MarkerShape::Square),
            "d" | "D" | "diamond" => Some(MarkerShape::Diamond),
            "+" | "x" | "cross" => Some(MarkerShape::Cross),
            "^" | "triangle-up" => Some(MarkerShape::TriangleUp),
            "v" | "triangle-down" => Some(MarkerShape::TriangleDown),
            "*" | "star" => Some(MarkerShape::Star),
            other => {
                warnings.style_fallback(format!(
                    "marker '{other}' not understood: defaulting to circle"
                ));
                Some(MarkerShape::Circle)
            }
        }
    }

    /// Wire name for this shape
    pub fn name(&self) -> &'static str {
        match self {
            MarkerShape::Circle => "circle",
            MarkerShape::Square => "square",
            MarkerShape::Diamond => "diamond",
            MarkerShape::Cross => "cross",
            MarkerShape::TriangleUp => "triangle-up",
            MarkerShape::TriangleDown => "triangle-down",
            MarkerShape::Star => "star",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_channels_to_hex() {
        let mut w = Warnings::new();
        assert_eq!(Color::Rgb(1.0, 0.0, 0.0).to_hex(&mut w), "#ff0000");
        assert_eq!(Color::Rgba(0.0, 0.0, 1.0, 0.5).to_hex(&mut w), "#0000ff");
        assert_eq!(Color::None.to_hex(&mut w), "none");
        assert!(w.is_empty());
    }

    #[test]
    fn test_named_colors() {
        let mut w = Warnings::new();
        assert_eq!(Color::Named("k".into()).to_hex(&mut w), "#000000");
        assert_eq!(Color::Named("Red".into()).to_hex(&mut w), "#ff0000");
        assert_eq!(Color::Named("#A0b1C2".into()).to_hex(&mut w), "#a0b1c2");
        assert_eq!(Color::Named("#abc".into()).to_hex(&mut w), "#aabbcc");
        assert!(w.is_empty());
    }

    #[test]
    fn test_unknown_color_falls_back_with_one_warning() {
        let mut w = Warnings::new();
        assert_eq!(Color::Named("plaid".into()).to_hex(&mut w), "#000000");
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_named_dash_styles() {
        let mut w = Warnings::new();
        assert_eq!(DashSpec::Named("solid".into()).to_dasharray(&mut w), "10,0");
        assert_eq!(DashSpec::Named("--".into()).to_dasharray(&mut w), "6,6");
        assert_eq!(DashSpec::Named(":".into()).to_dasharray(&mut w), "2,2");
        assert_eq!(
            DashSpec::Named("dashdot".into()).to_dasharray(&mut w),
            "4,4,2,4"
        );
        assert_eq!(DashSpec::Named("none".into()).to_dasharray(&mut w), "none");
        assert!(w.is_empty());
    }

    #[test]
    fn test_unknown_dash_falls_back_with_one_warning() {
        let mut w = Warnings::new();
        let dash = DashSpec::Named("wavy".into()).to_dasharray(&mut w);
        assert_eq!(dash, SOLID_DASHARRAY);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_on_off_dash_rounds_to_integers() {
        let mut w = Warnings::new();
        let dash = DashSpec::OnOff(vec![3.6, 1.2]).to_dasharray(&mut w);
        assert_eq!(dash, "4,1");
    }

    #[test]
    fn test_marker_symbols() {
        let mut w = Warnings::new();
        assert_eq!(
            MarkerShape::from_symbol("o", &mut w),
            Some(MarkerShape::Circle)
        );
        assert_eq!(
            MarkerShape::from_symbol("^", &mut w),
            Some(MarkerShape::TriangleUp)
        );
        assert_eq!(MarkerShape::from_symbol("None", &mut w), None);
        assert!(w.is_empty());

        assert_eq!(
            MarkerShape::from_symbol("hexagon2", &mut w),
            Some(MarkerShape::Circle)
        );
        assert_eq!(w.len(), 1);
    }
}
