use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::Cell;
use crate::error::{FormGridError, Result};

/// One row of cells. Rows are shared between snapshots of a sheet until edited.
pub type Row = Arc<Vec<Cell>>;

/// A rectangular merged region; its main cell carries the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merge {
    pub id: String,
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
    pub main_row: usize,
    pub main_col: usize,
}

impl Merge {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.min_row..=self.max_row).contains(&row) && (self.min_col..=self.max_col).contains(&col)
    }

    /// True when `(row, col)` lies in the box but not on its top row or left column.
    pub fn covers_interior(&self, row: usize, col: usize) -> bool {
        row > self.min_row && row <= self.max_row && col > self.min_col && col <= self.max_col
    }

    pub fn main(&self) -> (usize, usize) {
        (self.main_row, self.main_col)
    }

    pub fn row_span(&self) -> usize {
        self.max_row.saturating_sub(self.min_row).saturating_add(1)
    }

    pub fn col_span(&self) -> usize {
        self.max_col.saturating_sub(self.min_col).saturating_add(1)
    }

    /// The part of this merge inside a `rows`x`cols` sheet, `None` if nothing is.
    pub fn clamped_to(&self, rows: usize, cols: usize) -> Option<Merge> {
        if self.min_row >= rows
            || self.min_col >= cols
            || self.min_row > self.max_row
            || self.min_col > self.max_col
        {
            return None;
        }
        Some(Merge {
            max_row: self.max_row.min(rows - 1),
            max_col: self.max_col.min(cols - 1),
            ..self.clone()
        })
    }
}

/// A single sheet of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    #[serde(default)]
    pub sheet_index: i32,
    #[serde(default)]
    pub sheet_name: String,
    pub row_count: usize,
    pub max_cols: usize,
    #[serde(default)]
    pub table_data: Vec<Row>,
    #[serde(default)]
    pub merged_cells: Vec<Merge>,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub merged_cells_count: usize,
}

impl SheetInfo {
    /// Build a sheet from plain rows, deriving counts from the data.
    pub fn from_rows(
        sheet_index: i32,
        sheet_name: impl Into<String>,
        rows: Vec<Vec<Cell>>,
        merged_cells: Vec<Merge>,
    ) -> Self {
        let row_count = rows.len();
        let max_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let merged_cells_count = merged_cells.len();
        Self {
            sheet_index,
            sheet_name: sheet_name.into(),
            row_count,
            max_cols,
            table_data: rows.into_iter().map(Arc::new).collect(),
            merged_cells,
            file_name: String::new(),
            merged_cells_count,
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.table_data.get(row)?.get(col)
    }

    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.row_count && col < self.max_cols
    }

    /// The merge whose box contains `(row, col)`.
    pub fn merge_at(&self, row: usize, col: usize) -> Option<&Merge> {
        self.merged_cells.iter().find(|m| m.contains(row, col))
    }

    pub fn merge_by_id(&self, id: &str) -> Option<&Merge> {
        self.merged_cells.iter().find(|m| m.id == id)
    }

    /// Resolve a merged child to the main cell of its merge.
    pub fn resolve_main(&self, row: usize, col: usize) -> (usize, usize) {
        match self.cell(row, col) {
            Some(cell) if cell.is_merged_child() => {
                self.merge_at(row, col).map_or((row, col), Merge::main)
            }
            _ => (row, col),
        }
    }

    pub fn total_cells(&self) -> usize {
        self.row_count.saturating_mul(self.max_cols)
    }

    /// Check the declared shape and merge flags against the data.
    pub fn validate(&self) -> Result<()> {
        if self.table_data.len() != self.row_count {
            return Err(FormGridError::Shape(format!(
                "sheet {} declares {} rows but has {}",
                self.sheet_name,
                self.row_count,
                self.table_data.len()
            )));
        }
        for (r, row) in self.table_data.iter().enumerate() {
            if row.len() != self.max_cols {
                return Err(FormGridError::Shape(format!(
                    "sheet {} row {r} has {} cells, expected {}",
                    self.sheet_name,
                    row.len(),
                    self.max_cols
                )));
            }
        }
        for merge in &self.merged_cells {
            if !merge.contains(merge.main_row, merge.main_col) {
                return Err(FormGridError::Shape(format!(
                    "merge {} main cell lies outside its box",
                    merge.id
                )));
            }
            for r in merge.min_row..=merge.max_row {
                for c in merge.min_col..=merge.max_col {
                    let Some(cell) = self.cell(r, c) else {
                        return Err(FormGridError::Shape(format!(
                            "merge {} extends past the sheet at ({r}, {c})",
                            merge.id
                        )));
                    };
                    let expect_main = (r, c) == merge.main();
                    if !cell.merged || cell.is_main_cell != expect_main {
                        return Err(FormGridError::Shape(format!(
                            "cell ({r}, {c}) disagrees with merge {}",
                            merge.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Top-level form document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    pub id: i32,
    #[serde(default)]
    pub form_no: String,
    #[serde(default)]
    pub form_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dept_class_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_confirm: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_dept: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bgc_list: Vec<String>,
    #[serde(default)]
    pub excel_info: Vec<Arc<SheetInfo>>,
}

impl FormResponse {
    pub fn new(id: i32, form_name: impl Into<String>, sheets: Vec<SheetInfo>) -> Self {
        Self {
            id,
            form_no: String::new(),
            form_name: form_name.into(),
            version: String::new(),
            valid_time: None,
            dept_class_line: None,
            qa_confirm: None,
            confirm_dept: None,
            remarks: None,
            bgc_list: Vec::new(),
            excel_info: sheets.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn sheets(&self) -> &[Arc<SheetInfo>] {
        &self.excel_info
    }

    /// Position of the sheet with the given `sheetIndex`.
    pub fn position_by_index(&self, sheet_index: i32) -> Option<usize> {
        self.excel_info.iter().position(|s| s.sheet_index == sheet_index)
    }

    /// Position of the first sheet with the given name.
    pub fn position_by_name(&self, sheet_name: &str) -> Option<usize> {
        self.excel_info.iter().position(|s| s.sheet_name == sheet_name)
    }
}

/// The `{code, data, msg}` envelope the data service wraps responses in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub code: i32,
    pub data: Option<FormResponse>,
    #[serde(default)]
    pub msg: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn merged_sheet() -> SheetInfo {
        let mut rows = vec![vec![Cell::text(""); 2]; 3];
        for (r, row) in rows.iter_mut().enumerate() {
            row[0].merged = true;
            row[0].is_main_cell = r == 0;
            row[0].merge_id = Some("m".into());
        }
        SheetInfo::from_rows(
            0,
            "S",
            rows,
            vec![Merge {
                id: "m".into(),
                min_row: 0,
                min_col: 0,
                max_row: 2,
                max_col: 0,
                main_row: 0,
                main_col: 0,
            }],
        )
    }

    #[test]
    fn validate_accepts_consistent_merge() {
        assert!(merged_sheet().validate().is_ok());
    }

    #[test]
    fn validate_rejects_two_mains() {
        let mut sheet = merged_sheet();
        Arc::make_mut(&mut sheet.table_data[1])[0].is_main_cell = true;
        assert!(matches!(sheet.validate(), Err(FormGridError::Shape(_))));
    }

    #[test]
    fn resolve_main_for_child() {
        let sheet = merged_sheet();
        assert_eq!(sheet.resolve_main(2, 0), (0, 0));
        assert_eq!(sheet.resolve_main(2, 1), (2, 1));
    }

    #[test]
    fn interior_excludes_top_row_and_left_column() {
        let m = Merge {
            id: "x".into(),
            min_row: 1,
            min_col: 1,
            max_row: 3,
            max_col: 3,
            main_row: 1,
            main_col: 1,
        };
        assert!(!m.covers_interior(1, 2));
        assert!(!m.covers_interior(2, 1));
        assert!(m.covers_interior(2, 2));
        assert!(m.contains(1, 3));
    }

    #[test]
    fn clamped_to_trims_and_drops() {
        let m = Merge {
            id: "x".into(),
            min_row: 1,
            min_col: 0,
            max_row: usize::MAX,
            max_col: 1_000_000_000,
            main_row: 1,
            main_col: 0,
        };
        let clamped = m.clamped_to(4, 3).unwrap();
        assert_eq!((clamped.max_row, clamped.max_col), (3, 2));
        assert_eq!(clamped.row_span(), 3);
        assert!(m.clamped_to(1, 3).is_none());
        assert_eq!(m.row_span(), usize::MAX);
    }
}
