//! Layout engine for cell geometry and viewport management.
//!
//! This module handles:
//! - Merged-cell rectangles, skip sets and tap resolution
//! - Viewport state (scale, offsets, clamping, visible range)

mod sheet_layout;
mod viewport;

pub use sheet_layout::{
    CellRect, SheetLayout, VisibleRange, DEFAULT_CELL_HEIGHT, DEFAULT_CELL_WIDTH,
};
pub use viewport::{SheetViewState, Viewport, MAX_SCALE, MIN_SCALE};
