//! Recording draw surface.
//!
//! Captures painter output as plain commands. Used off-browser by the CLI
//! and by tests that assert on draw order and geometry.

use serde::Serialize;

use crate::layout::CellRect;
use crate::render::backend::{Bitmap, DrawSurface, TextStyle};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawCommand {
    Save,
    Restore,
    Scale { sx: f32, sy: f32 },
    Translate { dx: f32, dy: f32 },
    ClipRect { rect: CellRect },
    ClipRoundedRect { rect: CellRect, radius: f32 },
    FillRect { rect: CellRect, color: String },
    StrokeRect { rect: CellRect, color: String, line_width: f32 },
    Line { from: (f32, f32), to: (f32, f32), color: String, line_width: f32 },
    Text { text: String, x: f32, y: f32, color: String, size: f32 },
    /// Bitmaps are recorded by identity and size only
    Bitmap { id: usize, width: u32, height: u32, dst: CellRect },
}

#[derive(Debug, Default, Clone)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Index of the first command matching `pred`.
    pub fn position(&self, pred: impl Fn(&DrawCommand) -> bool) -> Option<usize> {
        self.commands.iter().position(pred)
    }

    /// All drawn strings, in order.
    pub fn texts(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Rectangles filled with exactly `color`.
    pub fn fills_with(&self, color: &str) -> Vec<CellRect> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillRect { rect, color: c } if c == color => Some(*rect),
                _ => None,
            })
            .collect()
    }

    /// Rectangles stroked with exactly `color`.
    pub fn strokes_with(&self, color: &str) -> Vec<CellRect> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::StrokeRect { rect, color: c, .. } if c == color => Some(*rect),
                _ => None,
            })
            .collect()
    }

    pub fn bitmaps(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Bitmap { .. }))
            .count()
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(&self.commands)?)
    }
}

impl DrawSurface for DisplayList {
    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.commands.push(DrawCommand::Scale { sx, sy });
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.commands.push(DrawCommand::Translate { dx, dy });
    }

    fn clip_rect(&mut self, rect: CellRect) {
        self.commands.push(DrawCommand::ClipRect { rect });
    }

    fn clip_rounded_rect(&mut self, rect: CellRect, radius: f32) {
        self.commands.push(DrawCommand::ClipRoundedRect { rect, radius });
    }

    fn fill_rect(&mut self, rect: CellRect, color: &str) {
        self.commands.push(DrawCommand::FillRect {
            rect,
            color: color.to_string(),
        });
    }

    fn stroke_rect(&mut self, rect: CellRect, color: &str, line_width: f32) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            color: color.to_string(),
            line_width,
        });
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: &str, line_width: f32) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            color: color.to_string(),
            line_width,
        });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
            color: style.color.clone(),
            size: style.size,
        });
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, dst: CellRect) {
        self.commands.push(DrawCommand::Bitmap {
            id: bitmap.id(),
            width: bitmap.width,
            height: bitmap.height,
            dst,
        });
    }
}
