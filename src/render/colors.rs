//! Color parsing and the fixed palette used when drawing forms.
//!
//! Colors travel as CSS strings, which Canvas 2D takes directly.

use crate::types::CellType;

/// A CSS color string (e.g., "#FF0000", "rgba(255, 0, 0, 0.5)")
pub type CssColor = String;

/// Parse a payload color string and normalize it to CSS format.
///
/// Supports formats:
/// - "#RRGGBB" (hex without alpha)
/// - "#AARRGGBB" (alpha first)
/// - "RRGGBB" (hex without # prefix)
/// - "rgb(r, g, b)" and "rgba(r, g, b, a)"
/// - a handful of color names ("red", "lightgray", ...)
pub fn parse_color(s: &str) -> Option<CssColor> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if s.starts_with('#') {
        parse_hex_color(s)
    } else if s.starts_with("rgba(") {
        parse_rgba_string(s).map(|_| s.to_string())
    } else if s.starts_with("rgb(") {
        parse_rgb_string(s).map(|_| s.to_string())
    } else if let Some(named) = named_color(s) {
        Some(named.to_string())
    } else {
        parse_hex_color(&format!("#{s}"))
    }
}

fn parse_hex_color(s: &str) -> Option<CssColor> {
    let hex = s.strip_prefix('#')?;

    match hex.len() {
        6 => {
            let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
            let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
            let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
            Some(format!("#{r:02X}{g:02X}{b:02X}"))
        }
        8 => {
            let a = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
            let r = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
            let g = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
            let b = u8::from_str_radix(hex.get(6..8)?, 16).ok()?;

            if a == 255 {
                Some(format!("#{r:02X}{g:02X}{b:02X}"))
            } else {
                let alpha = f64::from(a) / 255.0;
                Some(format!("rgba({r}, {g}, {b}, {alpha:.2})"))
            }
        }
        _ => None,
    }
}

fn parse_rgb_string(s: &str) -> Option<(u8, u8, u8)> {
    let inner = s.strip_prefix("rgb(")?.strip_suffix(')')?;
    let mut parts = inner.split(',').map(str::trim);
    let r: u8 = parts.next()?.parse().ok()?;
    let g: u8 = parts.next()?.parse().ok()?;
    let b: u8 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((r, g, b))
}

fn parse_rgba_string(s: &str) -> Option<(u8, u8, u8, f64)> {
    let inner = s.strip_prefix("rgba(")?.strip_suffix(')')?;
    let mut parts = inner.split(',').map(str::trim);
    let r: u8 = parts.next()?.parse().ok()?;
    let g: u8 = parts.next()?.parse().ok()?;
    let b: u8 = parts.next()?.parse().ok()?;
    let a: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !(0.0..=1.0).contains(&a) {
        return None;
    }
    Some((r, g, b, a))
}

fn named_color(name: &str) -> Option<&'static str> {
    let color = match name.to_ascii_lowercase().as_str() {
        "white" => "#FFFFFF",
        "black" => "#000000",
        "red" => "#FF0000",
        "green" => "#00FF00",
        "blue" => "#0000FF",
        "yellow" => "#FFFF00",
        "cyan" | "aqua" => "#00FFFF",
        "magenta" | "fuchsia" => "#FF00FF",
        "gray" | "grey" => "#888888",
        "lightgray" | "lightgrey" => "#CCCCCC",
        "darkgray" | "darkgrey" => "#444444",
        "lime" => "#00FF00",
        "maroon" => "#800000",
        "navy" => "#000080",
        "olive" => "#808000",
        "purple" => "#800080",
        "silver" => "#C0C0C0",
        "teal" => "#008080",
        _ => return None,
    };
    Some(color)
}

/// Background a cell gets from its type when it has no explicit color.
pub fn cell_type_background(cell_type: CellType) -> &'static str {
    match cell_type {
        CellType::Text => palette::WHITE,
        CellType::Average => "#E3F2FD",
        CellType::Option => "#F3E5F5",
        CellType::Range => "#E8F5E9",
        CellType::Image => "#FFF3E0",
        CellType::Signature => "#E1F5FE",
        CellType::Disabled => "#F5F5F5",
        CellType::Search => "#FFFDE7",
        CellType::ReadOnlyImage => "#FFF3E0",
    }
}

/// Common colors used in form rendering (CSS format)
pub mod palette {
    pub const WHITE: &str = "#FFFFFF";
    pub const BLACK: &str = "#000000";

    /// Grid line color (light gray)
    pub const GRID_LINE: &str = "#E0E0E0";

    /// Selection outline
    pub const SELECTION: &str = "#007AFF";

    /// Default border for edited cells
    pub const EDITED_BORDER: &str = "#10B981";

    /// Fill behind merged regions
    pub const MERGED_BACKGROUND: &str = "#F5F5F5";

    /// Overlay on disabled cells (50% black)
    pub const DISABLED_OVERLAY: &str = "rgba(0, 0, 0, 0.50)";

    /// Text color
    pub const TEXT: &str = "#000000";

    /// Image cell loading fill
    pub const IMAGE_LOADING: &str = "#E0E0E0";

    /// Image cell fill once retries are exhausted
    pub const IMAGE_ERROR: &str = "#FFEBEE";

    /// Image cell error text
    pub const IMAGE_ERROR_TEXT: &str = "#FF0000";

    /// Placeholder frame and glyph
    pub const PLACEHOLDER: &str = "#888888";
}
