//! Data and image providers.
//!
//! The editor core never fetches anything itself: forms come from a
//! [`DataProvider`] and bitmaps from an [`ImageProvider`]. This module also
//! ships the file-backed implementations used by the CLI and tests.

use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::error::{FormGridError, Result};
use crate::images::{ImageSource, SourceKind};
use crate::render::Bitmap;
use crate::types::{Cell, Envelope, FormResponse, Merge, SheetInfo};

/// Supplies form documents by id.
pub trait DataProvider {
    fn get_form_data(&self, form_id: i32) -> Result<FormResponse>;
}

/// Resolves an image source to decoded pixels. Called off the foreground.
pub trait ImageProvider: Send + Sync {
    fn load_image(&self, source: &ImageSource) -> Result<Bitmap>;
}

/// Decode a `{code, data, msg}` envelope.
///
/// A missing `data` is a data failure carrying `msg`. Sheets whose shape
/// disagrees with their declared counts are kept but logged.
pub fn parse_envelope(json: &str) -> Result<FormResponse> {
    let envelope: Envelope = serde_json::from_str(json)?;
    let Some(form) = envelope.data else {
        return Err(FormGridError::DataFailure(format!(
            "envelope code {} without data: {}",
            envelope.code, envelope.msg
        )));
    };
    for sheet in form.sheets() {
        if let Err(e) = sheet.validate() {
            warn!(sheet = %sheet.sheet_name, error = %e, "sheet shape mismatch");
        }
    }
    Ok(form)
}

/// The built-in sample form: 10x5 text cells with row 0, cols 0..=2 merged.
pub fn mock_form() -> FormResponse {
    const ROWS: usize = 10;
    const COLS: usize = 5;
    let mut rows: Vec<Vec<Cell>> = (0..ROWS)
        .map(|r| (0..COLS).map(|c| Cell::text(format!("Cell {r},{c}"))).collect())
        .collect();
    if let Some(first) = rows.first_mut() {
        for (col, cell) in first.iter_mut().take(3).enumerate() {
            cell.merged = true;
            cell.is_main_cell = col == 0;
            cell.merge_id = Some("merge1".to_string());
            if col == 0 {
                cell.colspan = 3;
            }
        }
    }
    let merge = Merge {
        id: "merge1".to_string(),
        min_row: 0,
        min_col: 0,
        max_row: 0,
        max_col: 2,
        main_row: 0,
        main_col: 0,
    };
    let mut sheet = SheetInfo::from_rows(0, "Sheet1", rows, vec![merge]);
    sheet.file_name = "sample.xlsx".to_string();

    let mut form = FormResponse::new(1, "Sample Excel Form", vec![sheet]);
    form.form_no = "FORM001".to_string();
    form.version = "1.0".to_string();
    form.valid_time = Some("2025-12-31".to_string());
    form.dept_class_line = Some("Engineering".to_string());
    form.qa_confirm = Some(1);
    form.confirm_dept = Some("QA Department".to_string());
    form.remarks = Some("Test form".to_string());
    form
}

/// Serves recorded envelopes from a directory; ids without a recording get
/// the sample form.
#[derive(Debug, Clone)]
pub struct AssetDataProvider {
    asset_dir: PathBuf,
}

impl AssetDataProvider {
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
        }
    }

    /// Asset file backing `form_id`, if any.
    pub fn asset_name(form_id: i32) -> Option<&'static str> {
        match form_id {
            2 => Some("excel_a.json"),
            3 => Some("excel_data.json"),
            4 => Some("excel_v2.json"),
            5 => Some("excel_v3.json"),
            6 => Some("excel_v4.json"),
            _ => None,
        }
    }

    fn load_asset(&self, name: &str) -> Result<FormResponse> {
        let path = self.asset_dir.join(name);
        let json = std::fs::read_to_string(&path).map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to read form asset");
            FormGridError::DataFailure(format!("{}: {e}", path.display()))
        })?;
        parse_envelope(&json)
    }
}

impl DataProvider for AssetDataProvider {
    fn get_form_data(&self, form_id: i32) -> Result<FormResponse> {
        match Self::asset_name(form_id) {
            Some(name) => {
                debug!(form_id, asset = name, "loading form asset");
                self.load_asset(name)
            }
            None => Ok(mock_form()),
        }
    }
}

/// Decodes PNG/JPEG files from disk.
///
/// Local paths are read as given; resource names resolve against an
/// optional resource directory. Network and content URIs are not served.
#[derive(Debug, Clone, Default)]
pub struct FileImageProvider {
    resource_dir: Option<PathBuf>,
}

impl FileImageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_dir: Some(dir.into()),
        }
    }

    fn resolve(&self, source: &ImageSource) -> Result<PathBuf> {
        let unsupported = || FormGridError::ImageLoadFailed {
            source_uri: source.uri.clone(),
            reason: format!("{:?} sources are not served by the file provider", source.kind),
        };
        match source.kind {
            SourceKind::LocalFile => source
                .local_path()
                .map(PathBuf::from)
                .ok_or_else(unsupported),
            SourceKind::Resource => self
                .resource_dir
                .as_deref()
                .map(|dir| dir.join(&source.uri))
                .ok_or_else(unsupported),
            SourceKind::Network | SourceKind::ContentUri => Err(unsupported()),
        }
    }
}

fn decode_file(path: &Path, uri: &str) -> Result<Bitmap> {
    let bytes = std::fs::read(path).map_err(|e| FormGridError::ImageLoadFailed {
        source_uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    let rgba = image::load_from_memory(&bytes)
        .map_err(|e| FormGridError::ImageSourceMalformed {
            source_uri: uri.to_string(),
            reason: e.to_string(),
        })?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    Bitmap::from_rgba(width, height, rgba.into_raw()).ok_or_else(|| {
        FormGridError::ImageSourceMalformed {
            source_uri: uri.to_string(),
            reason: "empty image".to_string(),
        }
    })
}

impl ImageProvider for FileImageProvider {
    fn load_image(&self, source: &ImageSource) -> Result<Bitmap> {
        let path = self.resolve(source)?;
        debug!(path = %path.display(), "decoding image");
        decode_file(&path, &source.uri)
    }
}
