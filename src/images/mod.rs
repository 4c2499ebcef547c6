//! Image cell subsystem.
//!
//! Image and read-only image cells hold a URI-like value. Bitmaps are fetched
//! off the foreground by an [`ImageWorker`], cached in a byte-budgeted LRU and
//! drawn according to the configured [`ScaleType`].

mod loader;
mod source;

pub use loader::{ImageCells, ImageWorker, InlineWorker, Job, ThreadWorker};
pub use source::{ImageSource, SourceKind};

use crate::config::ScaleType;
use crate::error::FormGridError;
use crate::layout::CellRect;
use crate::render::Bitmap;

/// Fraction of the cell's shorter side kept clear around an image
pub const IMAGE_PADDING_RATIO: f32 = 0.05;

/// Load state of one image cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageState {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Last attempt failed; `exhausted` once the retry budget is spent
    Error { exhausted: bool },
}

/// What the painter should show for an image cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageDrawState {
    Placeholder,
    Loading,
    Ready(Bitmap),
    Exhausted { retries: u32, max: u32 },
}

/// Callbacks for image load progress, run on the foreground.
pub trait ImageLoadListener {
    fn on_start(&mut self, _row: usize, _col: usize) {}
    fn on_success(&mut self, _row: usize, _col: usize) {}
    fn on_failed(&mut self, _row: usize, _col: usize, _error: &FormGridError) {}
}

/// Where a `width`x`height` bitmap lands inside `cell`.
///
/// The cell is padded by 5% of its shorter side first. `CenterCrop` may
/// return a rectangle larger than the padded area; callers clip to it.
pub fn fit_image_rect(scale_type: ScaleType, width: u32, height: u32, cell: CellRect) -> CellRect {
    let padding = cell.width.min(cell.height) * IMAGE_PADDING_RATIO;
    let area = cell.inset(padding);
    let (bw, bh) = (width as f32, height as f32);
    if bw <= 0.0 || bh <= 0.0 {
        return area;
    }

    let fit = (area.width / bw).min(area.height / bh);
    let scale = match scale_type {
        ScaleType::FitCenter => fit,
        ScaleType::CenterCrop => (area.width / bw).max(area.height / bh),
        ScaleType::CenterInside => {
            if bw <= area.width && bh <= area.height {
                1.0
            } else {
                fit
            }
        }
    };

    let (w, h) = (bw * scale, bh * scale);
    let (cx, cy) = area.center();
    CellRect::new(cx - w / 2.0, cy - h / 2.0, w, h)
}

/// Area inside `cell` that image content is clipped to.
pub fn image_clip_rect(cell: CellRect) -> CellRect {
    cell.inset(cell.width.min(cell.height) * IMAGE_PADDING_RATIO)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    const CELL: CellRect = CellRect {
        x: 0.0,
        y: 0.0,
        width: 120.0,
        height: 60.0,
    };

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn fit_center_keeps_aspect() {
        // padded area is 114 x 54
        let rect = fit_image_rect(ScaleType::FitCenter, 100, 100, CELL);
        assert!(close(rect.width, 54.0));
        assert!(close(rect.height, 54.0));
        let (cx, cy) = rect.center();
        assert!(close(cx, 60.0) && close(cy, 30.0));
    }

    #[test]
    fn center_crop_covers() {
        let rect = fit_image_rect(ScaleType::CenterCrop, 100, 100, CELL);
        assert!(close(rect.width, 114.0));
        assert!(close(rect.height, 114.0));
    }

    #[test]
    fn center_inside_does_not_enlarge() {
        let rect = fit_image_rect(ScaleType::CenterInside, 20, 10, CELL);
        assert_eq!((rect.width, rect.height), (20.0, 10.0));
        let rect = fit_image_rect(ScaleType::CenterInside, 200, 100, CELL);
        assert!(close(rect.width, 108.0) && close(rect.height, 54.0));
    }
}
