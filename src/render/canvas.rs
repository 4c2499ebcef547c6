//! Canvas 2D draw surface.
//!
//! Implements [`DrawSurface`] on top of the HTML Canvas 2D API via web-sys.
//! Bitmaps are uploaded once into offscreen canvases keyed by pixel-buffer
//! identity.

use std::collections::HashMap;

use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, ImageData};

use crate::error::{FormGridError, Result};
use crate::layout::CellRect;
use crate::render::backend::{Bitmap, DrawSurface, TextBaseline, TextStyle};

const BITMAP_CANVAS_CAP: usize = 256;

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    dpr: f32,
    bitmaps: HashMap<usize, HtmlCanvasElement>,
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .map_err(|_| FormGridError::Render("Failed to get 2d context".into()))?
        .ok_or_else(|| FormGridError::Render("No 2d context available".into()))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| FormGridError::Render("Failed to cast to CanvasRenderingContext2d".into()))
}

impl CanvasSurface {
    /// Create a surface from an HtmlCanvasElement
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self> {
        let ctx = context_2d(&canvas)?;
        Ok(Self {
            canvas,
            ctx,
            dpr: 1.0,
            bitmaps: HashMap::new(),
        })
    }

    /// Resize the backing store for `width`x`height` CSS pixels.
    /// Device sizes are clamped to the `u32` range before casting.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn resize(&mut self, width: f32, height: f32, dpr: f32) {
        self.dpr = dpr.max(1.0);
        let device = |css: f32| (css * self.dpr).round().clamp(0.0, u32::MAX as f32) as u32;
        self.canvas.set_width(device(width));
        self.canvas.set_height(device(height));
        let style = self.canvas.style();
        let _ = style.set_property("width", &format!("{width}px"));
        let _ = style.set_property("height", &format!("{height}px"));
    }

    /// Clear the whole canvas and reset the transform to device pixels.
    pub fn begin_frame(&self) {
        let _ = self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        self.ctx.clear_rect(
            0.0,
            0.0,
            f64::from(self.canvas.width()),
            f64::from(self.canvas.height()),
        );
        let dpr = f64::from(self.dpr);
        let _ = self.ctx.scale(dpr, dpr);
    }

    /// Forget uploaded bitmaps, e.g. when the form changes.
    pub fn clear_bitmaps(&mut self) {
        self.bitmaps.clear();
    }

    fn document() -> Option<Document> {
        web_sys::window()?.document()
    }

    fn upload(&mut self, bitmap: &Bitmap) -> Option<HtmlCanvasElement> {
        if let Some(canvas) = self.bitmaps.get(&bitmap.id()) {
            return Some(canvas.clone());
        }
        let canvas = Self::document()?
            .create_element("canvas")
            .ok()?
            .dyn_into::<HtmlCanvasElement>()
            .ok()?;
        canvas.set_width(bitmap.width);
        canvas.set_height(bitmap.height);
        let ctx = context_2d(&canvas).ok()?;
        let data = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(bitmap.pixels()),
            bitmap.width,
            bitmap.height,
        )
        .ok()?;
        ctx.put_image_data(&data, 0.0, 0.0).ok()?;

        if self.bitmaps.len() >= BITMAP_CANVAS_CAP {
            self.bitmaps.clear();
        }
        self.bitmaps.insert(bitmap.id(), canvas.clone());
        Some(canvas)
    }

    fn rounded_path(&self, rect: CellRect, radius: f32) {
        let (x, y) = (f64::from(rect.x), f64::from(rect.y));
        let (r, b) = (f64::from(rect.right()), f64::from(rect.bottom()));
        let radius = f64::from(radius.min(rect.width / 2.0).min(rect.height / 2.0));
        let ctx = &self.ctx;
        ctx.begin_path();
        ctx.move_to(x + radius, y);
        let _ = ctx.arc_to(r, y, r, b, radius);
        let _ = ctx.arc_to(r, b, x, b, radius);
        let _ = ctx.arc_to(x, b, x, y, radius);
        let _ = ctx.arc_to(x, y, r, y, radius);
        ctx.close_path();
    }
}

impl DrawSurface for CanvasSurface {
    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        let _ = self.ctx.scale(f64::from(sx), f64::from(sy));
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        let _ = self.ctx.translate(f64::from(dx), f64::from(dy));
    }

    fn clip_rect(&mut self, rect: CellRect) {
        self.ctx.begin_path();
        self.ctx.rect(
            f64::from(rect.x),
            f64::from(rect.y),
            f64::from(rect.width),
            f64::from(rect.height),
        );
        self.ctx.clip();
    }

    fn clip_rounded_rect(&mut self, rect: CellRect, radius: f32) {
        self.rounded_path(rect, radius);
        self.ctx.clip();
    }

    fn fill_rect(&mut self, rect: CellRect, color: &str) {
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(
            f64::from(rect.x),
            f64::from(rect.y),
            f64::from(rect.width),
            f64::from(rect.height),
        );
    }

    fn stroke_rect(&mut self, rect: CellRect, color: &str, line_width: f32) {
        self.ctx.set_stroke_style_str(color);
        self.ctx.set_line_width(f64::from(line_width));
        self.ctx.stroke_rect(
            f64::from(rect.x),
            f64::from(rect.y),
            f64::from(rect.width),
            f64::from(rect.height),
        );
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: &str, line_width: f32) {
        self.ctx.begin_path();
        self.ctx.set_stroke_style_str(color);
        self.ctx.set_line_width(f64::from(line_width));
        self.ctx.move_to(f64::from(from.0), f64::from(from.1));
        self.ctx.line_to(f64::from(to.0), f64::from(to.1));
        self.ctx.stroke();
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        self.ctx.set_fill_style_str(&style.color);
        self.ctx.set_font(&format!("{}px sans-serif", style.size));
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline(match style.baseline {
            TextBaseline::Middle => "middle",
            TextBaseline::Alphabetic => "alphabetic",
        });
        let _ = self.ctx.fill_text(text, f64::from(x), f64::from(y));
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, dst: CellRect) {
        let Some(source) = self.upload(bitmap) else {
            tracing::warn!(width = bitmap.width, height = bitmap.height, "bitmap upload failed");
            return;
        };
        let _ = self.ctx.draw_image_with_html_canvas_element_and_dw_and_dh(
            &source,
            f64::from(dst.x),
            f64::from(dst.y),
            f64::from(dst.width),
            f64::from(dst.height),
        );
    }
}
