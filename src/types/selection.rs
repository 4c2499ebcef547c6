use super::{Cell, Merge};

/// The cell currently open in the editor.
///
/// `row`/`col` always name the main cell when the tap landed inside a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub row: usize,
    pub col: usize,
    /// Cell as it was when selected
    pub cell: Cell,
    /// Merge the selected cell belongs to, if any
    pub merge: Option<Merge>,
}

impl Selection {
    pub fn new(row: usize, col: usize, cell: Cell, merge: Option<Merge>) -> Self {
        Self {
            row,
            col,
            cell,
            merge,
        }
    }

    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn is_read_only(&self) -> bool {
        !self.cell.cell_type.is_editable()
    }
}
