//! Draw surface trait for pluggable rendering implementations.
//!
//! The painter issues Canvas-2D-shaped calls against `DrawSurface`, so the
//! same draw order runs on a browser canvas or into a recorded display list.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::TableConfig;
use crate::images::ImageCells;
use crate::layout::{CellRect, SheetLayout, Viewport};
use crate::types::SheetInfo;

/// Decoded RGBA8 image ready to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pixels: Arc<[u8]>,
}

impl Bitmap {
    /// Wrap RGBA8 pixels; `None` when the buffer does not match the size.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (pixels.len() == expected && width > 0 && height > 0).then(|| Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// Solid-color bitmap, mostly useful in tests.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Option<Self> {
        let count = (width as usize).checked_mul(height as usize)?;
        let pixels = rgba.iter().copied().cycle().take(count * 4).collect();
        Self::from_rgba(width, height, pixels)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes charged against the image cache budget.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    /// Stable identity of the pixel buffer, shared by clones.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.pixels).cast::<u8>() as usize
    }
}

/// Vertical anchor for text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    /// `y` is the vertical center of the text
    Middle,
    /// `y` is the alphabetic baseline
    Alphabetic,
}

/// Text is always drawn horizontally centered on `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub color: String,
    pub size: f32,
    pub baseline: TextBaseline,
}

impl TextStyle {
    pub fn centered(color: &str, size: f32) -> Self {
        Self {
            color: color.to_string(),
            size,
            baseline: TextBaseline::Middle,
        }
    }
}

/// Canvas-like drawing target.
///
/// Coordinates are in the current transform; the painter sets up
/// `scale` then `translate` so cells are drawn in logical units.
pub trait DrawSurface {
    fn save(&mut self);
    fn restore(&mut self);
    fn scale(&mut self, sx: f32, sy: f32);
    fn translate(&mut self, dx: f32, dy: f32);
    fn clip_rect(&mut self, rect: CellRect);
    fn clip_rounded_rect(&mut self, rect: CellRect, radius: f32);
    fn fill_rect(&mut self, rect: CellRect, color: &str);
    fn stroke_rect(&mut self, rect: CellRect, color: &str, line_width: f32);
    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: &str, line_width: f32);
    fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle);
    /// Draw the whole bitmap scaled into `dst`.
    fn draw_bitmap(&mut self, bitmap: &Bitmap, dst: CellRect);
}

/// Everything the painter needs for one frame
pub struct RenderParams<'a> {
    pub sheet: &'a SheetInfo,
    pub layout: &'a SheetLayout,
    pub viewport: &'a Viewport,
    pub config: &'a TableConfig,
    /// Selected main cell
    pub selection: Option<(usize, usize)>,
    /// Transient, view-only background colors
    pub background_overrides: &'a HashMap<(usize, usize), String>,
    /// Cells edited since the sheet was shown
    pub edited: &'a HashSet<(usize, usize)>,
    /// Image state; `None` draws every image cell as a placeholder
    pub images: Option<&'a ImageCells>,
    /// Screen-space region being repainted; `None` repaints everything
    pub dirty: Option<CellRect>,
}
