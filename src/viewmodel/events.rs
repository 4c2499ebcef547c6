//! Events emitted by the view-model.
//!
//! Each event carries everything a listener needs, so no listener has to
//! read view-model state while handling one.

use serde::Serialize;

use crate::error::ErrorKind;

/// Which part of a cell changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateKind {
    Content,
    Background,
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ViewEvent {
    #[serde(rename_all = "camelCase")]
    CellUpdate { row: usize, col: usize, kind: UpdateKind },
    /// `index` is the position in the form's sheet list.
    SheetSwitch { index: usize, name: String },
    /// A reload found the previously shown sheet. A zero `scale` means
    /// "use whatever was stored for that sheet".
    #[serde(rename_all = "camelCase")]
    ViewStateRestore {
        scale: f32,
        offset_x: f32,
        offset_y: f32,
        sheet_index: i32,
        sheet_name: String,
    },
    ViewStateReset,
    Loading(bool),
    #[serde(rename_all = "camelCase")]
    EditorOpened { row: usize, col: usize, read_only: bool },
    EditorClosed,
    ScaleChanged(f32),
    Error { kind: ErrorKind, message: String },
}

impl ViewEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// The sheet and view a host wants back after a reload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetRefreshState {
    pub sheet_index: i32,
    pub sheet_name: String,
    /// Zero asks for the stored state of the matched sheet
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl SheetRefreshState {
    /// Hint that restores whatever is stored for the named sheet.
    pub fn stored(sheet_index: i32, sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_index,
            sheet_name: sheet_name.into(),
            ..Self::default()
        }
    }
}
