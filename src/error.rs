//! Structured error types for formgrid.
//!
//! Every failure the editor can report is non-fatal: the view-model turns
//! these into `ViewEvent::Error` and the UI stays usable.

use serde::Serialize;

/// All errors that can occur while loading, editing and rendering forms.
#[derive(Debug, thiserror::Error)]
pub enum FormGridError {
    /// Provider returned nothing usable (no response, zero sheets, bad envelope).
    #[error("Data failure: {0}")]
    DataFailure(String),

    /// Current sheet position is out of range after a data update.
    #[error("Invalid sheet index: {0}")]
    InvalidSheet(usize),

    /// A mutation referenced a cell that does not exist.
    #[error("Cell not found: ({row}, {col})")]
    CellNotFound { row: usize, col: usize },

    /// The image provider reported a failure.
    #[error("Image load failed for {source_uri}: {reason}")]
    ImageLoadFailed { source_uri: String, reason: String },

    /// The image source could not be parsed or decoded.
    #[error("Malformed image source {source_uri}: {reason}")]
    ImageSourceMalformed { source_uri: String, reason: String },

    /// Sheet shape does not match its declared row/column counts.
    #[error("Sheet shape: {0}")]
    Shape(String),

    /// Rendering error.
    #[error("Render error: {0}")]
    Render(String),

    /// JSON decoding error.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializable error tag carried by `ViewEvent::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    DataFailure,
    InvalidSheet,
    CellNotFound,
    ImageLoadFailed,
    ImageSourceMalformed,
    Other,
}

impl FormGridError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DataFailure(_) | Self::Json(_) => ErrorKind::DataFailure,
            Self::InvalidSheet(_) => ErrorKind::InvalidSheet,
            Self::CellNotFound { .. } => ErrorKind::CellNotFound,
            Self::ImageLoadFailed { .. } | Self::Io(_) => ErrorKind::ImageLoadFailed,
            Self::ImageSourceMalformed { .. } => ErrorKind::ImageSourceMalformed,
            Self::Shape(_) | Self::Render(_) => ErrorKind::Other,
        }
    }

    /// Whether a failed image load may be retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ImageSourceMalformed { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FormGridError>;

#[cfg(target_arch = "wasm32")]
impl From<FormGridError> for wasm_bindgen::JsValue {
    fn from(e: FormGridError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
