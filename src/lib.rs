//! formgrid - form spreadsheet editor core
//!
//! Displays and edits spreadsheet-shaped forms delivered as JSON, rendered
//! via Canvas 2D in the browser or into a display list natively:
//! - Merged cells with tap resolution to the main cell
//! - Edit tracking and export of edited cells per sheet
//! - Per-sheet zoom and pan remembered across tabs and reloads
//! - Image cells with background loading, retry and an LRU cache
//! - Partial redraw driven by a row-level table diff
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { FormGridView } from 'formgrid';
//! await init();
//! const view = new FormGridView(canvas, 800, 600, devicePixelRatio);
//! view.load_json(envelope);
//! view.render();
//! ```

// Data model and plumbing
pub mod config;
pub mod diff;
pub mod error;
pub mod presets;
pub mod provider;
pub mod types;
pub mod view_state;

// Editing
pub mod editor;
pub mod input;
pub mod viewmodel;

// Rendering
pub mod images;
pub mod layout;
pub mod render;
pub mod view;

use wasm_bindgen::prelude::*;

pub use config::TableConfig;
pub use editor::FormEditor;
#[cfg(target_arch = "wasm32")]
pub use editor::FormGridView;
pub use error::{ErrorKind, FormGridError, Result};
pub use types::*;
pub use view::TableView;
pub use viewmodel::{FormViewModel, SheetRefreshState, ViewEvent};

/// Validate an envelope and return its form as a `JsValue`.
///
/// # Errors
/// Returns an error if the JSON is not an envelope or carries no form.
#[wasm_bindgen]
pub fn parse_form(json: &str) -> std::result::Result<JsValue, JsValue> {
    let form = provider::parse_envelope(json).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&form)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
}

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
