//! Two-dimensional cell diff and the redraw decision built on it.
//!
//! Rows are compared pairwise by position. Rows that are still the same
//! shared allocation are skipped without looking at their cells.

use std::sync::Arc;

use crate::layout::{CellRect, SheetLayout, Viewport};
use crate::types::{Cell, Row};

/// Fraction of the sheet below which only the changed rectangle is redrawn
pub const PARTIAL_INVALIDATION_RATIO: f32 = 0.3;

/// One cell that differs between two snapshots
#[derive(Debug, Clone, PartialEq)]
pub struct CellDiff {
    pub row: usize,
    pub col: usize,
    pub old_cell: Option<Cell>,
    pub new_cell: Option<Cell>,
}

/// Inclusive cell-index rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBounds {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl CellBounds {
    fn single(row: usize, col: usize) -> Self {
        Self {
            min_row: row,
            min_col: col,
            max_row: row,
            max_col: col,
        }
    }

    fn include(&mut self, row: usize, col: usize) {
        self.min_row = self.min_row.min(row);
        self.max_row = self.max_row.max(row);
        self.min_col = self.min_col.min(col);
        self.max_col = self.max_col.max(col);
    }

    pub fn cell_count(&self) -> usize {
        (self.max_row - self.min_row + 1) * (self.max_col - self.min_col + 1)
    }

    /// Logical rectangle spanned by the corner units, ignoring merges.
    fn unit_rect(&self, layout: &SheetLayout) -> CellRect {
        layout
            .unit_rect(self.min_row, self.min_col)
            .union(&layout.unit_rect(self.max_row, self.max_col))
    }
}

/// Result of comparing two table snapshots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDiff {
    pub changed_cells: Vec<CellDiff>,
    pub added_rows: Vec<usize>,
    pub removed_rows: Vec<usize>,
    pub bounds: Option<CellBounds>,
}

impl TableDiff {
    pub fn is_empty(&self) -> bool {
        self.changed_cells.is_empty() && self.added_rows.is_empty() && self.removed_rows.is_empty()
    }

    pub fn is_row_removed(&self, row: usize) -> bool {
        self.removed_rows.binary_search(&row).is_ok()
    }
}

fn cells_equal(old: Option<&Cell>, new: Option<&Cell>) -> bool {
    match (old, new) {
        (None, None) => true,
        (Some(a), Some(b)) => a.is_render_equal(b),
        _ => false,
    }
}

fn grow(bounds: &mut Option<CellBounds>, row: usize, col: usize) {
    match bounds {
        Some(b) => b.include(row, col),
        None => *bounds = Some(CellBounds::single(row, col)),
    }
}

/// Compare two snapshots of a sheet's rows.
///
/// Added and removed rows widen the bounds across every column either
/// snapshot has in that row.
pub fn diff_tables(old: &[Row], new: &[Row]) -> TableDiff {
    let mut diff = TableDiff::default();
    let max_rows = old.len().max(new.len());

    for row in 0..max_rows {
        match (old.get(row), new.get(row)) {
            (None, Some(new_row)) => {
                diff.added_rows.push(row);
                grow(&mut diff.bounds, row, 0);
                grow(&mut diff.bounds, row, new_row.len().saturating_sub(1));
            }
            (Some(old_row), None) => {
                diff.removed_rows.push(row);
                grow(&mut diff.bounds, row, 0);
                grow(&mut diff.bounds, row, old_row.len().saturating_sub(1));
            }
            (Some(old_row), Some(new_row)) => {
                if Arc::ptr_eq(old_row, new_row) {
                    continue;
                }
                let max_cols = old_row.len().max(new_row.len());
                for col in 0..max_cols {
                    let old_cell = old_row.get(col);
                    let new_cell = new_row.get(col);
                    if !cells_equal(old_cell, new_cell) {
                        diff.changed_cells.push(CellDiff {
                            row,
                            col,
                            old_cell: old_cell.cloned(),
                            new_cell: new_cell.cloned(),
                        });
                        grow(&mut diff.bounds, row, col);
                    }
                }
            }
            (None, None) => {}
        }
    }

    diff
}

/// How much of the view has to be redrawn after a data update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Invalidation {
    /// Nothing changed
    None,
    /// Redraw this pixel rectangle only
    Partial(CellRect),
    /// Redraw everything
    Full,
}

impl Invalidation {
    /// Pick partial redraw when the changed bounds cover under 30% of the sheet.
    ///
    /// The partial rectangle is in screen pixels and covers each changed cell
    /// as drawn, so a merged main cell brings its whole merge box along.
    pub fn decide(
        diff: &TableDiff,
        total_cells: usize,
        layout: &SheetLayout,
        viewport: &Viewport,
    ) -> Self {
        if diff.is_empty() {
            return Self::None;
        }
        match diff.bounds {
            Some(bounds) if total_cells > 0 => {
                let ratio = bounds.cell_count() as f32 / total_cells as f32;
                if ratio < PARTIAL_INVALIDATION_RATIO {
                    let rect = diff
                        .changed_cells
                        .iter()
                        .map(|change| layout.cell_rect(change.row, change.col))
                        .fold(bounds.unit_rect(layout), |acc, rect| acc.union(&rect));
                    Self::Partial(viewport.rect_to_screen(&rect))
                } else {
                    Self::Full
                }
            }
            _ => Self::Full,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::float_cmp, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::{Merge, SheetInfo};

    fn rows(n: usize, m: usize) -> Vec<Row> {
        (0..n)
            .map(|r| Arc::new((0..m).map(|c| Cell::text(format!("{r},{c}"))).collect()))
            .collect()
    }

    fn layout(n: usize, m: usize) -> SheetLayout {
        let sheet = SheetInfo::from_rows(0, "S", vec![vec![Cell::text(""); m]; n], Vec::new());
        SheetLayout::new(&sheet, 120.0, 60.0)
    }

    #[test]
    fn identical_tables_have_empty_diff() {
        let a = rows(4, 3);
        let b: Vec<Row> = a.iter().map(|r| Arc::new(r.as_ref().clone())).collect();
        let diff = diff_tables(&a, &b);
        assert!(diff.is_empty());
        assert_eq!(diff.bounds, None);
    }

    #[test]
    fn single_change_reports_bounds() {
        let a = rows(4, 3);
        let mut b = a.clone();
        Arc::make_mut(&mut b[2])[1] = Cell::text("X");
        let diff = diff_tables(&a, &b);
        assert_eq!(diff.changed_cells.len(), 1);
        assert_eq!(diff.changed_cells[0].row, 2);
        assert_eq!(diff.changed_cells[0].col, 1);
        assert_eq!(diff.bounds, Some(CellBounds::single(2, 1)));
    }

    #[test]
    fn edited_flag_alone_is_a_change() {
        let a = rows(1, 1);
        let mut b = a.clone();
        Arc::make_mut(&mut b[0])[0].is_edited = true;
        assert_eq!(diff_tables(&a, &b).changed_cells.len(), 1);
    }

    #[test]
    fn added_and_removed_rows() {
        let a = rows(2, 3);
        let b = rows(4, 3);
        let diff = diff_tables(&a, &b);
        assert_eq!(diff.added_rows, vec![2, 3]);
        let bounds = diff.bounds.unwrap();
        assert_eq!((bounds.min_row, bounds.max_row), (2, 3));
        assert_eq!((bounds.min_col, bounds.max_col), (0, 2));

        let diff = diff_tables(&b, &a);
        assert_eq!(diff.removed_rows, vec![2, 3]);
        assert!(diff.is_row_removed(3));
    }

    #[test]
    fn small_change_invalidates_partially() {
        let a = rows(10, 10);
        let mut b = a.clone();
        Arc::make_mut(&mut b[1])[1] = Cell::text("X");
        let diff = diff_tables(&a, &b);
        let viewport = Viewport::new(800.0, 600.0);
        match Invalidation::decide(&diff, 100, &layout(10, 10), &viewport) {
            Invalidation::Partial(rect) => {
                assert_eq!(rect, CellRect::new(120.0, 60.0, 120.0, 60.0));
            }
            other => panic!("expected partial, got {other:?}"),
        }
    }

    #[test]
    fn large_change_invalidates_fully() {
        let a = rows(2, 2);
        let b = rows(2, 2)
            .into_iter()
            .map(|r| Arc::new(r.iter().map(|c| c.copy_with_edit("Z")).collect()))
            .collect::<Vec<Row>>();
        let diff = diff_tables(&a, &b);
        let viewport = Viewport::new(800.0, 600.0);
        let layout = layout(2, 2);
        assert_eq!(
            Invalidation::decide(&diff, 4, &layout, &viewport),
            Invalidation::Full
        );
        assert_eq!(
            Invalidation::decide(&TableDiff::default(), 4, &layout, &viewport),
            Invalidation::None
        );
    }

    #[test]
    fn merged_main_change_covers_merge_box() {
        let mut data = vec![vec![Cell::text(""); 4]; 10];
        for (r, row) in data.iter_mut().enumerate().take(3) {
            row[0].merged = true;
            row[0].is_main_cell = r == 0;
            row[0].merge_id = Some("m".into());
        }
        let merge = Merge {
            id: "m".into(),
            min_row: 0,
            min_col: 0,
            max_row: 2,
            max_col: 0,
            main_row: 0,
            main_col: 0,
        };
        let sheet = SheetInfo::from_rows(0, "S", data, vec![merge]);
        let layout = SheetLayout::new(&sheet, 120.0, 60.0);

        let mut changed = sheet.table_data.clone();
        Arc::make_mut(&mut changed[0])[0].value = "NEW".into();
        let diff = diff_tables(&sheet.table_data, &changed);
        let mut viewport = Viewport::new(800.0, 600.0);
        viewport.scale = 2.0;
        assert_eq!(
            Invalidation::decide(&diff, 40, &layout, &viewport),
            Invalidation::Partial(CellRect::new(0.0, 0.0, 240.0, 360.0))
        );
    }
}
