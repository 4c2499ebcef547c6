//! Pre-computed layout data for a sheet.
//!
//! Form sheets use a uniform grid, so cell positions are arithmetic. What is
//! worth computing once per sheet is the merge geometry: which cells draw a
//! merged rectangle, which are skipped, and which main cell a tap resolves to.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use super::Viewport;
use crate::types::{Merge, SheetInfo};

/// Default cell width in logical pixels
pub const DEFAULT_CELL_WIDTH: f32 = 120.0;

/// Default cell height in logical pixels
pub const DEFAULT_CELL_HEIGHT: f32 = 60.0;

/// Rectangle in logical (unscaled) sheet coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CellRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CellRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Smallest rectangle covering both.
    #[must_use]
    pub fn union(&self, other: &CellRect) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    pub fn intersects(&self, other: &CellRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Shrink on every side by `amount`.
    #[must_use]
    pub fn inset(&self, amount: f32) -> Self {
        Self {
            x: self.x + amount,
            y: self.y + amount,
            width: (self.width - 2.0 * amount).max(0.0),
            height: (self.height - 2.0 * amount).max(0.0),
        }
    }
}

/// Inclusive window of cell indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

impl VisibleRange {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    /// Row-major iteration over every index pair in the window.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.first_row..=self.last_row)
            .flat_map(move |r| (self.first_col..=self.last_col).map(move |c| (r, c)))
    }
}

/// Pre-computed layout data for a sheet
#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub cell_width: f32,
    pub cell_height: f32,
    pub rows: usize,
    pub cols: usize,
    /// Rectangles for merged cells (main and children); plain cells are one unit
    merged_rects: HashMap<(usize, usize), CellRect>,
    /// Cells that must not be drawn individually
    skipped: HashSet<(usize, usize)>,
    /// Merged child -> main cell of its enclosing merge
    mains: HashMap<(usize, usize), (usize, usize)>,
    /// Merge boxes in logical coordinates, drawn as merged backgrounds
    merge_boxes: Vec<CellRect>,
}

impl SheetLayout {
    /// Build the layout for `sheet` with the given unit cell size.
    pub fn new(sheet: &SheetInfo, cell_width: f32, cell_height: f32) -> Self {
        let mut layout = Self {
            cell_width,
            cell_height,
            rows: sheet.row_count,
            cols: sheet.max_cols,
            merged_rects: HashMap::new(),
            skipped: HashSet::new(),
            mains: HashMap::new(),
            merge_boxes: Vec::with_capacity(sheet.merged_cells.len()),
        };

        for declared in &sheet.merged_cells {
            let Some(merge) = declared.clamped_to(layout.rows, layout.cols) else {
                warn!(merge = %declared.id, "merge lies outside the sheet, ignoring it");
                continue;
            };
            if merge != *declared {
                warn!(merge = %declared.id, "merge extends past the sheet, clamping it");
            }
            layout.merge_boxes.push(layout.merge_rect(&merge));
            for r in merge.min_row..=merge.max_row {
                for c in merge.min_col..=merge.max_col {
                    if merge.covers_interior(r, c) {
                        layout.skipped.insert((r, c));
                    }
                }
            }
        }

        for (r, row) in sheet.table_data.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if !cell.merged {
                    continue;
                }
                if cell.is_main_cell {
                    let rect = match cell.merge_id.as_deref().and_then(|id| sheet.merge_by_id(id)) {
                        Some(merge) => layout.merge_rect(merge),
                        None => CellRect::new(
                            c as f32 * cell_width,
                            r as f32 * cell_height,
                            cell.colspan.max(1) as f32 * cell_width,
                            cell.rowspan.max(1) as f32 * cell_height,
                        ),
                    };
                    layout.merged_rects.insert((r, c), rect);
                } else {
                    layout.skipped.insert((r, c));
                    if let Some(merge) = sheet.merge_at(r, c) {
                        layout.merged_rects.insert((r, c), layout.merge_rect(merge));
                        layout.mains.insert((r, c), merge.main());
                    }
                }
            }
        }

        layout
    }

    /// Box of `merge`, cut off at the sheet edge.
    fn merge_rect(&self, merge: &Merge) -> CellRect {
        let rows = merge.row_span().min(self.rows.saturating_sub(merge.min_row)).max(1);
        let cols = merge.col_span().min(self.cols.saturating_sub(merge.min_col)).max(1);
        CellRect::new(
            merge.min_col as f32 * self.cell_width,
            merge.min_row as f32 * self.cell_height,
            cols as f32 * self.cell_width,
            rows as f32 * self.cell_height,
        )
    }

    /// Rectangle of one grid unit.
    pub fn unit_rect(&self, row: usize, col: usize) -> CellRect {
        CellRect::new(
            col as f32 * self.cell_width,
            row as f32 * self.cell_height,
            self.cell_width,
            self.cell_height,
        )
    }

    /// Drawn rectangle of a cell in logical coordinates.
    ///
    /// Main merged cells span their merge, merged children report the box of
    /// the merge enclosing them, everything else is one unit.
    pub fn cell_rect(&self, row: usize, col: usize) -> CellRect {
        self.merged_rects
            .get(&(row, col))
            .copied()
            .unwrap_or_else(|| self.unit_rect(row, col))
    }

    /// True for cells that are drawn as part of another cell's merge.
    pub fn should_skip_cell(&self, row: usize, col: usize) -> bool {
        self.skipped.contains(&(row, col))
    }

    /// Resolve a merged child to its main cell.
    pub fn resolve_main(&self, row: usize, col: usize) -> (usize, usize) {
        self.mains.get(&(row, col)).copied().unwrap_or((row, col))
    }

    pub fn merge_boxes(&self) -> &[CellRect] {
        &self.merge_boxes
    }

    pub fn content_width(&self) -> f32 {
        self.cols as f32 * self.cell_width
    }

    pub fn content_height(&self) -> f32 {
        self.rows as f32 * self.cell_height
    }

    /// Cell under logical coordinates, `None` outside the sheet.
    pub fn cell_at(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        if x < 0.0 || y < 0.0 || self.cell_width <= 0.0 || self.cell_height <= 0.0 {
            return None;
        }
        let col = unit_index(x, self.cell_width, self.cols);
        let row = unit_index(y, self.cell_height, self.rows);
        (row < self.rows && col < self.cols).then_some((row, col))
    }

    /// Convert a screen pixel to the cell a tap there selects.
    pub fn hit_test(&self, x: f32, y: f32, viewport: &Viewport) -> Option<(usize, usize)> {
        let (lx, ly) = viewport.to_sheet(x, y);
        let (row, col) = self.cell_at(lx, ly)?;
        Some(self.resolve_main(row, col))
    }

    /// Cells visible under `viewport`, padded by one cell on each side.
    pub fn visible_range(&self, viewport: &Viewport) -> Option<VisibleRange> {
        if self.rows == 0 || self.cols == 0 || viewport.scale <= 0.0 {
            return None;
        }
        let first_col = unit_index(-viewport.offset_x, self.cell_width, self.cols).saturating_sub(1);
        let first_row =
            unit_index(-viewport.offset_y, self.cell_height, self.rows).saturating_sub(1);
        let right = viewport.width / viewport.scale - viewport.offset_x;
        let bottom = viewport.height / viewport.scale - viewport.offset_y;
        let last_col = (unit_index(right, self.cell_width, self.cols) + 1).min(self.cols - 1);
        let last_row = (unit_index(bottom, self.cell_height, self.rows) + 1).min(self.rows - 1);

        (first_row <= last_row && first_col <= last_col).then_some(VisibleRange {
            first_row,
            last_row,
            first_col,
            last_col,
        })
    }
}

/// Index of the grid unit containing `pos`, clamped to `0..=limit`.
///
/// The quotient is floored and clamped before the cast, so it fits.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_index(pos: f32, unit: f32, limit: usize) -> usize {
    let index = (pos / unit).floor();
    if !index.is_finite() || index <= 0.0 || unit <= 0.0 {
        return 0;
    }
    index.min(limit as f32) as usize
}
