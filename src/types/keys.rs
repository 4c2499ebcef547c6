use std::fmt;

/// Identifies one sheet of one form for view-state storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SheetKey {
    pub form_id: i32,
    pub sheet_index: i32,
    pub sheet_name: String,
}

impl SheetKey {
    pub fn new(form_id: i32, sheet_index: i32, sheet_name: impl Into<String>) -> Self {
        Self {
            form_id,
            sheet_index,
            sheet_name: sheet_name.into(),
        }
    }
}

impl fmt::Display for SheetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.form_id, self.sheet_index, self.sheet_name)
    }
}

/// Identifies one cell of one sheet for the image cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub sheet_index: i32,
    pub row: usize,
    pub col: usize,
}

impl CellKey {
    pub fn new(sheet_index: i32, row: usize, col: usize) -> Self {
        Self {
            sheet_index,
            row,
            col,
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{}", self.sheet_index, self.row, self.col)
    }
}

/// `"row,col"` key used in the edited-cells map.
pub fn position_key(row: usize, col: usize) -> String {
    format!("{row},{col}")
}
