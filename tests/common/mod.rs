//! Shared helpers for the integration tests: fixture paths, form builders,
//! a manually driven image worker and image providers with known behavior.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use formgrid::config::TableConfig;
use formgrid::error::{FormGridError, Result};
use formgrid::images::{ImageSource, ImageWorker, InlineWorker, Job};
use formgrid::provider::{AssetDataProvider, ImageProvider};
use formgrid::render::Bitmap;
use formgrid::{Cell, FormEditor, FormResponse, Merge, SheetInfo};

pub const VIEW_WIDTH: f32 = 800.0;
pub const VIEW_HEIGHT: f32 = 600.0;

/// Directory holding the recorded form envelopes.
pub fn forms_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/forms")
}

pub fn asset_provider() -> AssetDataProvider {
    AssetDataProvider::new(forms_dir())
}

/// `rows`x`cols` text sheet with `"r,c"` values.
pub fn text_sheet(index: i32, name: &str, rows: usize, cols: usize) -> SheetInfo {
    let data = (0..rows)
        .map(|r| (0..cols).map(|c| Cell::text(format!("{r},{c}"))).collect())
        .collect();
    SheetInfo::from_rows(index, name, data, Vec::new())
}

/// Mark every cell of `merge` and set the main cell's spans.
pub fn apply_merge(rows: &mut [Vec<Cell>], merge: &Merge) {
    for r in merge.min_row..=merge.max_row {
        for c in merge.min_col..=merge.max_col {
            let cell = &mut rows[r][c];
            cell.merged = true;
            cell.merge_id = Some(merge.id.clone());
            cell.is_main_cell = (r, c) == merge.main();
            if cell.is_main_cell {
                cell.rowspan = u32::try_from(merge.row_span()).unwrap();
                cell.colspan = u32::try_from(merge.col_span()).unwrap();
            }
        }
    }
}

pub fn merge(id: &str, min_row: usize, min_col: usize, max_row: usize, max_col: usize) -> Merge {
    Merge {
        id: id.to_string(),
        min_row,
        min_col,
        max_row,
        max_col,
        main_row: min_row,
        main_col: min_col,
    }
}

/// Text sheet with the given merges applied.
pub fn merged_sheet(index: i32, name: &str, rows: usize, cols: usize, merges: Vec<Merge>) -> SheetInfo {
    let mut data: Vec<Vec<Cell>> = (0..rows)
        .map(|r| (0..cols).map(|c| Cell::text(format!("{r},{c}"))).collect())
        .collect();
    for m in &merges {
        apply_merge(&mut data, m);
    }
    SheetInfo::from_rows(index, name, data, merges)
}

pub fn form(id: i32, sheets: Vec<SheetInfo>) -> FormResponse {
    FormResponse::new(id, "Test Form", sheets)
}

/// Holds jobs until the test runs them.
#[derive(Default)]
pub struct QueueWorker {
    jobs: Mutex<Vec<Job>>,
}

impl QueueWorker {
    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn run_all(&self) -> usize {
        let jobs: Vec<Job> = std::mem::take(&mut *self.jobs.lock());
        let count = jobs.len();
        for job in jobs {
            job();
        }
        count
    }
}

impl ImageWorker for QueueWorker {
    fn spawn(&self, job: Job) -> Result<()> {
        self.jobs.lock().push(job);
        Ok(())
    }
}

/// Fails every load and counts the attempts.
#[derive(Default)]
pub struct UnreachableImages {
    pub attempts: AtomicUsize,
}

impl UnreachableImages {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ImageProvider for UnreachableImages {
    fn load_image(&self, source: &ImageSource) -> Result<Bitmap> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(FormGridError::ImageLoadFailed {
            source_uri: source.uri.clone(),
            reason: "host unreachable".into(),
        })
    }
}

/// Serves a small solid bitmap for every source.
pub struct SolidImages;

impl ImageProvider for SolidImages {
    fn load_image(&self, _source: &ImageSource) -> Result<Bitmap> {
        Bitmap::solid(4, 2, [255, 0, 0, 255]).ok_or_else(|| FormGridError::Render("empty".into()))
    }
}

/// Editor over the recorded fixtures with images that never load.
pub fn fixture_editor() -> FormEditor {
    FormEditor::new(
        Box::new(asset_provider()),
        Arc::new(UnreachableImages::default()),
        Arc::new(InlineWorker),
        TableConfig::default(),
        VIEW_WIDTH,
        VIEW_HEIGHT,
    )
}

/// Editor whose forms are pushed in by the test.
pub fn editor_with(images: Arc<dyn ImageProvider>, worker: Arc<dyn ImageWorker>) -> FormEditor {
    FormEditor::new(
        Box::new(AssetDataProvider::new(forms_dir())),
        images,
        worker,
        TableConfig::default(),
        VIEW_WIDTH,
        VIEW_HEIGHT,
    )
}
