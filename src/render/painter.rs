//! Frame painter.
//!
//! Draw order inside one save/scale/translate frame: merged-region
//! backgrounds, then every visible non-skipped cell, then the selection.

use crate::images::{fit_image_rect, image_clip_rect, ImageDrawState};
use crate::layout::CellRect;
use crate::render::backend::{DrawSurface, RenderParams, TextBaseline, TextStyle};
use crate::render::colors::{cell_type_background, palette, parse_color};
use crate::types::{Cell, CellKey, CellType};

const GRID_LINE_WIDTH: f32 = 1.0;
const EDITED_BORDER_WIDTH: f32 = 2.0;
const SELECTION_LINE_WIDTH: f32 = 3.0;
const IMAGE_STATUS_FONT_SIZE: f32 = 12.0;
const PLACEHOLDER_STROKE_WIDTH: f32 = 2.0;
const PLACEHOLDER_ICON: &str = "\u{1F4F7}";
const SIGNATURE_TEXT_GAP: f32 = 10.0;

/// Counters for one painted frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintStats {
    pub cells: usize,
    pub images: usize,
    pub merged_backgrounds: usize,
}

/// Paint one frame of `params.sheet` onto `surface`.
pub fn paint(surface: &mut dyn DrawSurface, params: &RenderParams) -> PaintStats {
    let mut stats = PaintStats::default();
    let viewport = params.viewport;
    let layout = params.layout;

    surface.save();
    surface.scale(viewport.scale, viewport.scale);
    surface.translate(viewport.offset_x, viewport.offset_y);

    // Dirty region arrives in screen space
    let dirty = params.dirty.map(|rect| {
        let (x, y) = viewport.to_sheet(rect.x, rect.y);
        CellRect::new(x, y, rect.width / viewport.scale, rect.height / viewport.scale)
    });
    if let Some(clip) = dirty {
        surface.clip_rect(clip);
    }
    let needs_paint = |rect: &CellRect| dirty.map_or(true, |clip| clip.intersects(rect));

    for rect in layout.merge_boxes() {
        if !needs_paint(rect) {
            continue;
        }
        surface.fill_rect(*rect, palette::MERGED_BACKGROUND);
        surface.stroke_rect(*rect, palette::GRID_LINE, GRID_LINE_WIDTH);
        stats.merged_backgrounds += 1;
    }

    if let Some(range) = layout.visible_range(viewport) {
        for (row, col) in range.cells() {
            if layout.should_skip_cell(row, col) {
                continue;
            }
            let Some(cell) = params.sheet.cell(row, col) else {
                continue;
            };
            let rect = layout.cell_rect(row, col);
            if !needs_paint(&rect) {
                continue;
            }
            if paint_cell(surface, params, row, col, cell, rect) {
                stats.images += 1;
            }
            stats.cells += 1;
        }
    }

    if let Some((row, col)) = params.selection {
        let (main_row, main_col) = layout.resolve_main(row, col);
        let rect = layout.cell_rect(main_row, main_col);
        surface.stroke_rect(rect, palette::SELECTION, SELECTION_LINE_WIDTH);
    }

    surface.restore();
    stats
}

/// Background for a cell: override, then explicit color, then type palette.
pub fn resolve_background(cell: &Cell, override_color: Option<&str>) -> String {
    if let Some(color) = override_color.and_then(parse_color) {
        return color;
    }
    cell.explicit_background()
        .and_then(parse_color)
        .unwrap_or_else(|| cell_type_background(cell.cell_type).to_string())
}

/// Returns `true` when the cell was drawn as an image cell.
fn paint_cell(
    surface: &mut dyn DrawSurface,
    params: &RenderParams,
    row: usize,
    col: usize,
    cell: &Cell,
    rect: CellRect,
) -> bool {
    let config = params.config;
    let background = resolve_background(
        cell,
        params.background_overrides.get(&(row, col)).map(String::as_str),
    );
    surface.fill_rect(rect, &background);
    surface.stroke_rect(rect, palette::GRID_LINE, GRID_LINE_WIDTH);

    if config.show_edited_cell_border && params.edited.contains(&(row, col)) {
        let color = parse_color(&config.edited_cell_border_color)
            .unwrap_or_else(|| palette::EDITED_BORDER.to_string());
        surface.stroke_rect(rect.inset(EDITED_BORDER_WIDTH / 2.0), &color, EDITED_BORDER_WIDTH);
    }

    match cell.cell_type {
        CellType::Image | CellType::ReadOnlyImage => {
            paint_image(surface, params, row, col, cell, rect);
            return true;
        }
        CellType::Signature => paint_signature(surface, params, cell, rect),
        CellType::Average => {
            let text = format!("AVG: {}", cell.value);
            paint_text(surface, params, &text, rect);
        }
        CellType::Disabled => {
            paint_text(surface, params, cell.display_text(), rect);
            surface.fill_rect(rect, palette::DISABLED_OVERLAY);
        }
        _ => paint_text(surface, params, cell.display_text(), rect),
    }
    false
}

fn paint_text(surface: &mut dyn DrawSurface, params: &RenderParams, text: &str, rect: CellRect) {
    if text.is_empty() {
        return;
    }
    let (cx, cy) = rect.center();
    surface.save();
    surface.clip_rect(rect);
    surface.fill_text(
        text,
        cx,
        cy,
        &TextStyle::centered(palette::TEXT, params.config.font_size),
    );
    surface.restore();
}

fn paint_signature(surface: &mut dyn DrawSurface, params: &RenderParams, cell: &Cell, rect: CellRect) {
    let line_y = rect.bottom() - rect.height * 0.3;
    let inset = rect.width * 0.1;
    surface.line(
        (rect.x + inset, line_y),
        (rect.right() - inset, line_y),
        palette::BLACK,
        GRID_LINE_WIDTH,
    );
    if cell.value.is_empty() {
        return;
    }
    let (cx, _) = rect.center();
    let style = TextStyle {
        color: palette::TEXT.to_string(),
        size: params.config.font_size,
        baseline: TextBaseline::Alphabetic,
    };
    surface.save();
    surface.clip_rect(rect);
    surface.fill_text(&cell.value, cx, line_y - SIGNATURE_TEXT_GAP, &style);
    surface.restore();
}

fn paint_image(
    surface: &mut dyn DrawSurface,
    params: &RenderParams,
    row: usize,
    col: usize,
    cell: &Cell,
    rect: CellRect,
) {
    let config = params.config;
    let key = CellKey::new(params.sheet.sheet_index, row, col);
    let state = params
        .images
        .map_or(ImageDrawState::Placeholder, |images| images.draw_state(key, cell));
    let (cx, cy) = rect.center();

    match state {
        ImageDrawState::Ready(bitmap) => {
            let clip = image_clip_rect(rect);
            let dst = fit_image_rect(config.image_scale_type, bitmap.width, bitmap.height, rect);
            surface.save();
            if config.image_corner_radius > 0.0 {
                surface.clip_rounded_rect(clip, config.image_corner_radius);
            } else {
                surface.clip_rect(clip);
            }
            surface.draw_bitmap(&bitmap, dst);
            surface.restore();
        }
        ImageDrawState::Loading => {
            let fill = parse_color(&config.image_loading_color)
                .unwrap_or_else(|| palette::IMAGE_LOADING.to_string());
            surface.fill_rect(rect, &fill);
            surface.fill_text(
                &config.image_loading_text,
                cx,
                cy,
                &TextStyle::centered(palette::PLACEHOLDER, IMAGE_STATUS_FONT_SIZE),
            );
        }
        ImageDrawState::Exhausted { retries, max } => {
            surface.fill_rect(rect, palette::IMAGE_ERROR);
            let text = format!("{} ({retries}/{max})", config.image_error_text);
            surface.fill_text(
                &text,
                cx,
                cy,
                &TextStyle::centered(palette::IMAGE_ERROR_TEXT, IMAGE_STATUS_FONT_SIZE),
            );
        }
        ImageDrawState::Placeholder => {
            let side = rect.width.min(rect.height) * 0.5;
            let icon = CellRect::new(cx - side / 2.0, cy - side / 2.0, side, side);
            surface.stroke_rect(icon, palette::PLACEHOLDER, PLACEHOLDER_STROKE_WIDTH);
            surface.fill_text(
                PLACEHOLDER_ICON,
                cx,
                cy,
                &TextStyle::centered(palette::PLACEHOLDER, side * 0.6),
            );
        }
    }
}
