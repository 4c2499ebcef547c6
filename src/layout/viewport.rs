//! Viewport state management for panning and zoom.
//!
//! Screen coordinates are `(logical + offset) * scale`. Offsets are in logical
//! units and never positive: panning right reveals columns by making
//! `offset_x` more negative.

use serde::{Deserialize, Serialize};

use super::CellRect;

/// Lower bound for gesture-driven scale
pub const MIN_SCALE: f32 = 0.5;

/// Upper bound for gesture-driven scale
pub const MAX_SCALE: f32 = 3.0;

/// Zoom and pan of one sheet, the part remembered across tab switches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetViewState {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for SheetViewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// Viewport state - represents the visible area of the sheet
#[derive(Debug, Clone)]
pub struct Viewport {
    /// Horizontal translation in logical units (<= 0)
    pub offset_x: f32,
    /// Vertical translation in logical units (<= 0)
    pub offset_y: f32,
    /// View width in pixels
    pub width: f32,
    /// View height in pixels
    pub height: f32,
    /// Zoom scale factor (1.0 = 100%)
    pub scale: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            width,
            height,
            scale: 1.0,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
        }
    }

    /// Convert sheet coordinates to screen coordinates
    pub fn to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        ((x + self.offset_x) * self.scale, (y + self.offset_y) * self.scale)
    }

    /// Convert a sheet rectangle to screen pixels
    pub fn rect_to_screen(&self, rect: &CellRect) -> CellRect {
        let (x, y) = self.to_screen(rect.x, rect.y);
        CellRect::new(x, y, rect.width * self.scale, rect.height * self.scale)
    }

    /// Convert screen coordinates to sheet coordinates
    pub fn to_sheet(&self, screen_x: f32, screen_y: f32) -> (f32, f32) {
        (
            screen_x / self.scale - self.offset_x,
            screen_y / self.scale - self.offset_y,
        )
    }

    /// Clamp offsets so the content never scrolls past its edges.
    ///
    /// Content that fits in the view is pinned to the origin.
    pub fn clamp_offsets(&mut self, content_width: f32, content_height: f32) {
        self.offset_x = clamp_axis(self.offset_x, content_width, self.width / self.scale);
        self.offset_y = clamp_axis(self.offset_y, content_height, self.height / self.scale);
    }

    /// Pan by a screen-space drag distance.
    pub fn pan_by(&mut self, dx: f32, dy: f32, content_width: f32, content_height: f32) {
        self.offset_x += dx / self.scale;
        self.offset_y += dy / self.scale;
        self.clamp_offsets(content_width, content_height);
    }

    /// Set the scale, clamped to the gesture range.
    pub fn set_scale(&mut self, scale: f32, content_width: f32, content_height: f32) {
        self.scale = scale.clamp(self.min_scale, self.max_scale);
        self.clamp_offsets(content_width, content_height);
    }

    /// Multiply the scale by a pinch factor.
    pub fn zoom_by(&mut self, factor: f32, content_width: f32, content_height: f32) {
        self.set_scale(self.scale * factor, content_width, content_height);
    }

    /// Resize the view
    pub fn resize(&mut self, width: f32, height: f32, content_width: f32, content_height: f32) {
        self.width = width;
        self.height = height;
        self.clamp_offsets(content_width, content_height);
    }

    pub fn state(&self) -> SheetViewState {
        SheetViewState {
            scale: self.scale,
            offset_x: self.offset_x,
            offset_y: self.offset_y,
        }
    }

    /// Apply a stored state, then clamp against the current content.
    pub fn apply_state(&mut self, state: SheetViewState, content_width: f32, content_height: f32) {
        self.offset_x = state.offset_x;
        self.offset_y = state.offset_y;
        self.set_scale(state.scale, content_width, content_height);
    }

    pub fn reset(&mut self) {
        self.scale = 1.0;
        self.offset_x = 0.0;
        self.offset_y = 0.0;
    }
}

fn clamp_axis(offset: f32, content: f32, view: f32) -> f32 {
    if content <= view {
        0.0
    } else {
        offset.clamp(-(content - view), 0.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_roundtrip() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.scale = 2.0;
        vp.offset_x = -100.0;
        vp.offset_y = -50.0;
        assert_eq!(vp.to_screen(150.0, 100.0), (100.0, 100.0));
        assert_eq!(vp.to_sheet(100.0, 100.0), (150.0, 100.0));
    }

    #[test]
    fn test_small_content_pins_to_origin() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.offset_x = -50.0;
        vp.offset_y = -50.0;
        vp.clamp_offsets(400.0, 300.0);
        assert_eq!((vp.offset_x, vp.offset_y), (0.0, 0.0));
    }

    #[test]
    fn test_offsets_clamped_to_content() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.pan_by(-5000.0, 200.0, 2400.0, 6000.0);
        assert_eq!(vp.offset_x, -1600.0);
        assert_eq!(vp.offset_y, 0.0);
    }

    #[test]
    fn test_pan_is_divided_by_scale() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.set_scale(2.0, 10_000.0, 10_000.0);
        vp.pan_by(-100.0, -40.0, 10_000.0, 10_000.0);
        assert_eq!((vp.offset_x, vp.offset_y), (-50.0, -20.0));
    }

    #[test]
    fn test_scale_clamped() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.zoom_by(10.0, 1000.0, 1000.0);
        assert_eq!(vp.scale, MAX_SCALE);
        vp.zoom_by(0.01, 1000.0, 1000.0);
        assert_eq!(vp.scale, MIN_SCALE);
    }
}
