//! Editor façade.
//!
//! Couples a [`FormViewModel`] with a [`TableView`]: every operation runs on
//! the view-model first, then the queued events are replayed onto the view.
//! Hosts that want the events too get them back from each call.

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::FormGridView;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::TableConfig;
use crate::diff::Invalidation;
use crate::error::Result;
use crate::images::ImageWorker;
use crate::layout::SheetViewState;
use crate::provider::{DataProvider, ImageProvider};
use crate::render::{DrawSurface, PaintStats};
use crate::types::FormResponse;
use crate::view::TableView;
use crate::viewmodel::{EditedCells, FormViewModel, SheetRefreshState, ViewEvent};

pub struct FormEditor {
    model: FormViewModel,
    view: TableView,
}

impl FormEditor {
    pub fn new(
        data: Box<dyn DataProvider>,
        images: Arc<dyn ImageProvider>,
        worker: Arc<dyn ImageWorker>,
        config: TableConfig,
        width: f32,
        height: f32,
    ) -> Self {
        Self {
            model: FormViewModel::new(data),
            view: TableView::new(config, width, height, images, worker),
        }
    }

    pub fn model(&self) -> &FormViewModel {
        &self.model
    }

    pub fn view(&self) -> &TableView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut TableView {
        &mut self.view
    }

    /// Replay queued view-model events onto the view and hand them back.
    pub fn sync(&mut self) -> Vec<ViewEvent> {
        let events = self.model.drain_events();
        for event in &events {
            self.apply(event);
        }
        events
    }

    fn apply(&mut self, event: &ViewEvent) {
        match event {
            ViewEvent::SheetSwitch { index, name } => {
                let (Some(form_id), Some(sheet)) =
                    (self.model.form_id(), self.model.current_sheet().cloned())
                else {
                    return;
                };
                debug!(position = index, sheet = %name, "showing sheet");
                self.view.show_sheet(form_id, sheet);
            }
            ViewEvent::ViewStateRestore {
                scale,
                offset_x,
                offset_y,
                ..
            } => self.view.queue_restore(SheetViewState {
                scale: *scale,
                offset_x: *offset_x,
                offset_y: *offset_y,
            }),
            ViewEvent::ViewStateReset => self.view.queue_reset(),
            ViewEvent::CellUpdate { .. } => {
                if let Some(sheet) = self.model.current_sheet().cloned() {
                    self.view.update_sheet(sheet);
                }
                self.view
                    .set_background_overrides(self.model.background_overrides());
            }
            ViewEvent::EditorOpened { row, col, .. } => {
                self.view.set_selection(Some((*row, *col)));
            }
            ViewEvent::EditorClosed => self.view.set_selection(None),
            ViewEvent::ScaleChanged(scale) => self.view.set_scale(*scale),
            ViewEvent::Loading(_) | ViewEvent::Error { .. } => {}
        }
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<(T, Vec<ViewEvent>)> {
        let events = self.sync();
        result.map(|value| (value, events))
    }

    // ------------------------------------------------------------------
    // Forms and sheets
    // ------------------------------------------------------------------

    pub fn load_form(&mut self, form_id: i32) -> Result<Vec<ViewEvent>> {
        info!(form_id, "loading form");
        let result = self.model.load_form(form_id);
        self.finish(result).map(|((), events)| events)
    }

    pub fn load_response(&mut self, form: FormResponse) -> Result<Vec<ViewEvent>> {
        let result = self.model.load_response(form);
        self.finish(result).map(|((), events)| events)
    }

    /// Reload, restoring the hinted sheet. Image state is dropped since
    /// sources may have changed.
    pub fn reload_form(&mut self, form_id: i32, hint: &SheetRefreshState) -> Result<Vec<ViewEvent>> {
        info!(form_id, sheet = %hint.sheet_name, "reloading form");
        let result = self.model.reload_form(form_id, hint);
        if result.is_ok() {
            self.view.images_mut().clear();
        }
        self.finish(result).map(|((), events)| events)
    }

    pub fn reload_response(
        &mut self,
        form: FormResponse,
        hint: &SheetRefreshState,
    ) -> Result<Vec<ViewEvent>> {
        let result = self.model.reload_response(form, hint);
        if result.is_ok() {
            self.view.images_mut().clear();
        }
        self.finish(result).map(|((), events)| events)
    }

    /// Hint describing the shown sheet and its current zoom and pan.
    pub fn refresh_hint(&self) -> SheetRefreshState {
        let state = self.view.view_state();
        self.model
            .current_sheet()
            .map(|sheet| SheetRefreshState {
                sheet_index: sheet.sheet_index,
                sheet_name: sheet.sheet_name.clone(),
                scale: state.scale,
                offset_x: state.offset_x,
                offset_y: state.offset_y,
            })
            .unwrap_or_default()
    }

    pub fn switch_sheet(&mut self, position: usize) -> Result<Vec<ViewEvent>> {
        let result = self.model.switch_sheet(position);
        self.finish(result).map(|((), events)| events)
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Select the cell under screen `(x, y)`, if any.
    pub fn tap(&mut self, x: f32, y: f32) -> Result<Vec<ViewEvent>> {
        match self.view.hit_test(x, y) {
            Some((row, col)) => self.select_cell(row, col),
            None => Ok(Vec::new()),
        }
    }

    pub fn touch_down(&mut self, x: f32, y: f32) {
        self.view.touch_down(x, y);
    }

    pub fn touch_move(&mut self, x: f32, y: f32) {
        self.view.touch_move(x, y);
    }

    /// End a touch; a tap selects the cell under it.
    pub fn touch_up(&mut self, x: f32, y: f32, now_ms: f64) -> Result<Vec<ViewEvent>> {
        match self.view.touch_up(x, y, now_ms) {
            Some((row, col)) => self.select_cell(row, col),
            None => Ok(Vec::new()),
        }
    }

    pub fn pinch(&mut self, factor: f32, now_ms: f64) {
        self.view.pinch(factor, now_ms);
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.view.resize(width, height);
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    pub fn select_cell(&mut self, row: usize, col: usize) -> Result<Vec<ViewEvent>> {
        let result = self.model.select_cell(row, col);
        self.finish(result).map(|((), events)| events)
    }

    /// Keystroke; the commit lands once [`Self::tick`] passes the debounce.
    pub fn type_draft(&mut self, draft: &str, now_ms: f64) {
        self.model.type_draft(draft, now_ms);
    }

    pub fn insert_symbol(&mut self, symbol: &str, cursor: Option<usize>) -> usize {
        self.model.insert_symbol(symbol, cursor)
    }

    /// Commit the draft into the selected cell and close the editor.
    pub fn confirm_edit(&mut self) -> Result<Vec<ViewEvent>> {
        let flushed = self.model.flush_commit();
        let applied = flushed.and_then(|_| match self.model.selection().map(|s| s.position()) {
            Some((row, col)) => self.model.apply_draft(row, col).map(|_| ()),
            None => Ok(()),
        });
        if applied.is_ok() {
            self.model.close_editor();
        }
        self.finish(applied).map(|((), events)| events)
    }

    pub fn cancel_edit(&mut self) -> Vec<ViewEvent> {
        self.model.close_editor();
        self.sync()
    }

    pub fn update_cell_content(&mut self, row: usize, col: usize, value: &str) -> Result<Vec<ViewEvent>> {
        let result = self.model.update_cell_content(row, col, value);
        self.finish(result).map(|(_, events)| events)
    }

    pub fn set_cell_background(&mut self, row: usize, col: usize, color: &str) -> Result<Vec<ViewEvent>> {
        let result = self.model.update_cell_background_color_string(row, col, color);
        self.finish(result).map(|(_, events)| events)
    }

    pub fn set_background_override(&mut self, row: usize, col: usize, color: &str) -> Result<Vec<ViewEvent>> {
        let result = self.model.set_background_override(row, col, color);
        self.finish(result).map(|(_, events)| events)
    }

    pub fn zoom_in(&mut self) -> Vec<ViewEvent> {
        self.model.zoom_in();
        self.sync()
    }

    pub fn zoom_out(&mut self) -> Vec<ViewEvent> {
        self.model.zoom_out();
        self.sync()
    }

    pub fn edited_cells(&self) -> EditedCells {
        self.model.edited_cells()
    }

    pub fn edited_cells_json(&self) -> Result<String> {
        self.model.edited_cells_json()
    }

    /// Collect edited cells and clear their flags.
    pub fn take_edited_cells(&mut self) -> (EditedCells, Vec<ViewEvent>) {
        let edited = self.model.edited_cells_and_reset();
        (edited, self.sync())
    }

    // ------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------

    /// Advance timers: debounced commits, scroll settling and image
    /// completions. Returns whether a redraw is wanted.
    pub fn tick(&mut self, now_ms: f64) -> Result<bool> {
        let committed = self.model.poll_commit(now_ms);
        self.sync();
        let settled = self.view.tick(now_ms);
        let loaded = self.view.pump();
        committed?;
        Ok(settled || loaded || self.view.needs_redraw())
    }

    pub fn render(&mut self, surface: &mut dyn DrawSurface) -> PaintStats {
        self.view.render(surface)
    }

    /// Redraw what changed since the last frame; returns what the last
    /// update asked for when nothing else is pending.
    pub fn render_pending(&mut self, surface: &mut dyn DrawSurface) -> PaintStats {
        self.view.render_pending(surface)
    }

    pub fn retry_failed_images(&mut self) -> usize {
        self.view.retry_failed_images()
    }

    /// How the last data update would redraw the shown sheet.
    pub fn refresh_sheet(&mut self) -> Invalidation {
        match self.model.current_sheet().cloned() {
            Some(sheet) => self.view.update_sheet(sheet),
            None => Invalidation::None,
        }
    }
}
