//! `FormGridView`: the WASM entry point.
//!
//! Forms are pushed in by the host as JSON envelopes and images as decoded
//! RGBA buffers. Everything runs on the JS thread, so image loads use the
//! inline worker.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

use super::FormEditor;
use crate::config::TableConfig;
use crate::error::{FormGridError, Result};
use crate::images::{ImageSource, InlineWorker};
use crate::input::now_ms;
use crate::provider::{parse_envelope, DataProvider, ImageProvider};
use crate::render::{Bitmap, CanvasSurface};
use crate::types::FormResponse;
use crate::viewmodel::{SheetRefreshState, ViewEvent};

/// Forms only arrive through `load_json`.
struct HostData;

impl DataProvider for HostData {
    fn get_form_data(&self, form_id: i32) -> Result<FormResponse> {
        Err(FormGridError::DataFailure(format!(
            "form {form_id} must be supplied by the host"
        )))
    }
}

/// Bitmaps registered by the host, keyed by source URI.
#[derive(Default)]
struct HostImages {
    bitmaps: Mutex<HashMap<String, Bitmap>>,
}

impl ImageProvider for HostImages {
    fn load_image(&self, source: &ImageSource) -> Result<Bitmap> {
        self.bitmaps
            .lock()
            .get(&source.uri)
            .cloned()
            .ok_or_else(|| FormGridError::ImageLoadFailed {
                source_uri: source.uri.clone(),
                reason: "not registered by host".into(),
            })
    }
}

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_js<T: serde::Serialize>(value: &T) -> std::result::Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(js_err)
}

#[wasm_bindgen]
pub struct FormGridView {
    editor: FormEditor,
    surface: CanvasSurface,
    images: Arc<HostImages>,
    events: Vec<ViewEvent>,
}

#[wasm_bindgen]
impl FormGridView {
    /// Create a view drawing into `canvas` at `width`x`height` CSS pixels.
    ///
    /// `config_json` is an optional `TableConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(
        canvas: HtmlCanvasElement,
        width: f32,
        height: f32,
        dpr: f32,
        config_json: Option<String>,
    ) -> std::result::Result<FormGridView, JsValue> {
        console_error_panic_hook::set_once();
        let config = match config_json {
            Some(json) => TableConfig::from_json(&json).map_err(js_err)?,
            None => TableConfig::default(),
        };
        let mut surface = CanvasSurface::new(canvas).map_err(js_err)?;
        surface.resize(width, height, dpr);
        let images = Arc::new(HostImages::default());
        let editor = FormEditor::new(
            Box::new(HostData),
            images.clone(),
            Arc::new(InlineWorker),
            config,
            width,
            height,
        );
        Ok(Self {
            editor,
            surface,
            images,
            events: Vec::new(),
        })
    }

    fn keep(&mut self, result: Result<Vec<ViewEvent>>) -> std::result::Result<(), JsValue> {
        match result {
            Ok(events) => {
                self.events.extend(events);
                Ok(())
            }
            Err(e) => {
                self.events.extend(self.editor.sync());
                Err(js_err(e))
            }
        }
    }

    /// Load a `{code, data, msg}` envelope.
    pub fn load_json(&mut self, json: &str) -> std::result::Result<(), JsValue> {
        let form = parse_envelope(json).map_err(js_err)?;
        let result = self.editor.load_response(form);
        self.keep(result)
    }

    /// Reload, staying on the current sheet when it still exists.
    pub fn reload_json(&mut self, json: &str) -> std::result::Result<(), JsValue> {
        let form = parse_envelope(json).map_err(js_err)?;
        let hint = self.editor.refresh_hint();
        let result = self.editor.reload_response(form, &hint);
        self.keep(result)
    }

    /// Reload and show `sheet_name` with whatever view state it had.
    pub fn reload_json_to(
        &mut self,
        json: &str,
        sheet_index: i32,
        sheet_name: &str,
    ) -> std::result::Result<(), JsValue> {
        let form = parse_envelope(json).map_err(js_err)?;
        let hint = SheetRefreshState::stored(sheet_index, sheet_name);
        let result = self.editor.reload_response(form, &hint);
        self.keep(result)
    }

    pub fn switch_sheet(&mut self, position: usize) -> std::result::Result<(), JsValue> {
        let result = self.editor.switch_sheet(position);
        self.keep(result)
    }

    /// Register decoded RGBA pixels for an image source URI.
    pub fn register_image(
        &mut self,
        uri: &str,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    ) -> std::result::Result<(), JsValue> {
        let bitmap = Bitmap::from_rgba(width, height, rgba)
            .ok_or_else(|| js_err(format!("{uri}: pixel buffer does not match {width}x{height}")))?;
        self.images.bitmaps.lock().insert(uri.to_string(), bitmap);
        Ok(())
    }

    pub fn retry_failed_images(&mut self) -> usize {
        self.editor.retry_failed_images()
    }

    pub fn touch_start(&mut self, x: f32, y: f32) {
        self.editor.touch_down(x, y);
    }

    pub fn touch_move(&mut self, x: f32, y: f32) {
        self.editor.touch_move(x, y);
    }

    pub fn touch_end(&mut self, x: f32, y: f32) -> std::result::Result<(), JsValue> {
        let result = self.editor.touch_up(x, y, now_ms());
        self.keep(result)
    }

    pub fn pinch(&mut self, factor: f32) {
        self.editor.pinch(factor, now_ms());
    }

    pub fn resize(&mut self, width: f32, height: f32, dpr: f32) {
        self.surface.resize(width, height, dpr);
        self.editor.resize(width, height);
    }

    pub fn type_draft(&mut self, draft: &str) {
        self.editor.type_draft(draft, now_ms());
    }

    pub fn insert_symbol(&mut self, symbol: &str, cursor: Option<usize>) -> usize {
        self.editor.insert_symbol(symbol, cursor)
    }

    pub fn draft(&self) -> String {
        self.editor.model().draft().to_string()
    }

    pub fn confirm_edit(&mut self) -> std::result::Result<(), JsValue> {
        let result = self.editor.confirm_edit();
        self.keep(result)
    }

    pub fn cancel_edit(&mut self) {
        let events = self.editor.cancel_edit();
        self.events.extend(events);
    }

    pub fn set_cell_background(
        &mut self,
        row: usize,
        col: usize,
        color: &str,
    ) -> std::result::Result<(), JsValue> {
        let result = self.editor.set_cell_background(row, col, color);
        self.keep(result)
    }

    pub fn zoom_in(&mut self) -> f32 {
        let events = self.editor.zoom_in();
        self.events.extend(events);
        self.editor.model().scale_factor()
    }

    pub fn zoom_out(&mut self) -> f32 {
        let events = self.editor.zoom_out();
        self.events.extend(events);
        self.editor.model().scale_factor()
    }

    /// Advance timers; returns whether `render` should be called.
    pub fn tick(&mut self) -> bool {
        match self.editor.tick(now_ms()) {
            Ok(redraw) => redraw,
            Err(e) => {
                warn!(error = %e, "debounced commit failed");
                true
            }
        }
    }

    pub fn render(&mut self) {
        self.surface.begin_frame();
        self.editor.render(&mut self.surface);
    }

    /// Events emitted since the last call, as tagged objects.
    pub fn take_events(&mut self) -> std::result::Result<JsValue, JsValue> {
        let events = std::mem::take(&mut self.events);
        to_js(&events)
    }

    pub fn edited_cells(&self) -> std::result::Result<JsValue, JsValue> {
        to_js(&self.editor.edited_cells())
    }

    pub fn edited_cells_json(&self) -> std::result::Result<String, JsValue> {
        self.editor.edited_cells_json().map_err(js_err)
    }

    pub fn take_edited_cells(&mut self) -> std::result::Result<JsValue, JsValue> {
        let (edited, events) = self.editor.take_edited_cells();
        self.events.extend(events);
        to_js(&edited)
    }

    pub fn view_state(&self) -> std::result::Result<JsValue, JsValue> {
        to_js(&self.editor.view().view_state())
    }
}
