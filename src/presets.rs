//! Choices offered by the cell editor.

/// A named background color; an empty color means "no color" (white).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPreset {
    pub color: &'static str,
    pub name: &'static str,
}

pub const BACKGROUND_PRESETS: [ColorPreset; 7] = [
    ColorPreset { color: "", name: "White" },
    ColorPreset { color: "#FFEBEE", name: "Red" },
    ColorPreset { color: "#E3F2FD", name: "Blue" },
    ColorPreset { color: "#E8F5E9", name: "Green" },
    ColorPreset { color: "#FFF9C4", name: "Yellow" },
    ColorPreset { color: "#F3E5F5", name: "Purple" },
    ColorPreset { color: "#FCE4EC", name: "Pink" },
];

pub const SYMBOL_PRESETS: [&str; 15] = [
    "♥", "❀", "★", "✓", "✗", "●", "■", "▲", "◆", "☺", "→", "←", "↑", "↓", "⇒",
];

/// Look up a background preset by its display name, ignoring case.
pub fn background_preset(name: &str) -> Option<&'static ColorPreset> {
    BACKGROUND_PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::parse_color;

    #[test]
    fn colored_presets_parse() {
        for preset in BACKGROUND_PRESETS.iter().skip(1) {
            assert!(parse_color(preset.color).is_some(), "{}", preset.name);
        }
        assert_eq!(background_preset("red").map(|p| p.color), Some("#FFEBEE"));
        assert!(background_preset("orange").is_none());
    }
}
