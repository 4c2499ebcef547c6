//! Table view: the renderer-side state for one form.
//!
//! Owns the viewport, the per-sheet view-state store and the image cells.
//! The view-model never touches any of this; the editor façade forwards
//! view-model events here.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::config::TableConfig;
use crate::diff::{diff_tables, Invalidation, TableDiff};
use crate::images::{ImageCells, ImageLoadListener, ImageWorker};
use crate::input::{Gesture, GestureTracker};
use crate::layout::{CellRect, SheetLayout, SheetViewState, Viewport};
use crate::provider::ImageProvider;
use crate::render::{paint, DrawSurface, PaintStats, RenderParams};
use crate::types::{CellKey, SheetInfo, SheetKey};
use crate::view_state::ViewStateStore;

/// How the next shown sheet picks its zoom and pan.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingView {
    Restore(SheetViewState),
    Stored,
    Reset,
}

struct Shown {
    form_id: i32,
    sheet: Arc<SheetInfo>,
    layout: SheetLayout,
}

impl Shown {
    fn key(&self) -> SheetKey {
        SheetKey::new(self.form_id, self.sheet.sheet_index, self.sheet.sheet_name.clone())
    }
}

pub struct TableView {
    config: TableConfig,
    viewport: Viewport,
    view_states: ViewStateStore,
    images: ImageCells,
    gestures: GestureTracker,
    shown: Option<Shown>,
    pending_view: Option<PendingView>,
    edited: HashSet<(usize, usize)>,
    selection: Option<(usize, usize)>,
    background_overrides: HashMap<(usize, usize), String>,
    needs_full_redraw: bool,
    dirty: Option<CellRect>,
}

impl TableView {
    pub fn new(
        config: TableConfig,
        width: f32,
        height: f32,
        provider: Arc<dyn ImageProvider>,
        worker: Arc<dyn ImageWorker>,
    ) -> Self {
        let images = ImageCells::new(provider, worker, &config);
        let mut viewport = Viewport::new(width, height);
        viewport.min_scale = config.min_zoom;
        viewport.max_scale = config.max_zoom;
        Self {
            config,
            viewport,
            view_states: ViewStateStore::new(),
            images,
            gestures: GestureTracker::new(),
            shown: None,
            pending_view: None,
            edited: HashSet::new(),
            selection: None,
            background_overrides: HashMap::new(),
            needs_full_redraw: true,
            dirty: None,
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn view_states(&self) -> &ViewStateStore {
        &self.view_states
    }

    pub fn view_states_mut(&mut self) -> &mut ViewStateStore {
        &mut self.view_states
    }

    pub fn images(&self) -> &ImageCells {
        &self.images
    }

    pub fn images_mut(&mut self) -> &mut ImageCells {
        &mut self.images
    }

    pub fn set_image_listener(&mut self, listener: Box<dyn ImageLoadListener>) {
        self.images.set_listener(listener);
    }

    pub fn sheet(&self) -> Option<&Arc<SheetInfo>> {
        self.shown.as_ref().map(|s| &s.sheet)
    }

    pub fn layout(&self) -> Option<&SheetLayout> {
        self.shown.as_ref().map(|s| &s.layout)
    }

    pub fn current_key(&self) -> Option<SheetKey> {
        self.shown.as_ref().map(Shown::key)
    }

    pub fn view_state(&self) -> SheetViewState {
        self.viewport.state()
    }

    pub fn is_scrolling(&self) -> bool {
        self.gestures.is_scrolling()
    }

    pub fn edited_cells(&self) -> &HashSet<(usize, usize)> {
        &self.edited
    }

    fn content_size(&self) -> (f32, f32) {
        self.shown
            .as_ref()
            .map_or((0.0, 0.0), |s| (s.layout.content_width(), s.layout.content_height()))
    }

    fn mark_full(&mut self) {
        self.needs_full_redraw = true;
        self.dirty = None;
    }

    fn mark_dirty(&mut self, rect: CellRect) {
        if self.needs_full_redraw {
            return;
        }
        self.dirty = Some(self.dirty.map_or(rect, |d| d.union(&rect)));
    }

    /// Whether anything awaits a redraw.
    pub fn needs_redraw(&self) -> bool {
        self.needs_full_redraw || self.dirty.is_some()
    }

    // ------------------------------------------------------------------
    // Sheets and view state
    // ------------------------------------------------------------------

    /// Remember the current sheet's zoom and pan.
    pub fn save_current_state(&mut self) {
        if let Some(key) = self.current_key() {
            let state = self.viewport.state();
            self.view_states.save(key, state);
        }
    }

    /// The next `show_sheet` applies `state`; a zero scale means "stored".
    pub fn queue_restore(&mut self, state: SheetViewState) {
        self.pending_view = Some(if state.scale <= f32::EPSILON {
            PendingView::Stored
        } else {
            PendingView::Restore(state)
        });
    }

    /// The next `show_sheet` starts at scale 1 and the origin.
    pub fn queue_reset(&mut self) {
        self.pending_view = Some(PendingView::Reset);
    }

    /// Show a sheet, saving the outgoing sheet's view state first.
    ///
    /// A different form drops all image state and the old form's view states.
    pub fn show_sheet(&mut self, form_id: i32, sheet: Arc<SheetInfo>) {
        match self.shown.as_ref().map(|s| s.form_id) {
            Some(old_id) if old_id != form_id => {
                debug!(old_id, form_id, "form changed, dropping view and image state");
                self.clear_form_states(old_id);
                self.images.clear();
            }
            Some(_) => self.save_current_state(),
            None => self.images.clear(),
        }

        let layout = SheetLayout::new(&sheet, self.config.cell_width, self.config.cell_height);
        let shown = Shown {
            form_id,
            sheet,
            layout,
        };
        let key = shown.key();
        let (cw, ch) = (shown.layout.content_width(), shown.layout.content_height());
        self.edited = edited_positions(&shown.sheet);
        self.shown = Some(shown);
        self.selection = None;
        self.background_overrides.clear();

        match self.pending_view.take().unwrap_or(PendingView::Stored) {
            PendingView::Restore(state) => {
                debug!(key = %key, ?state, "restoring requested view state");
                self.viewport.apply_state(state, cw, ch);
            }
            PendingView::Stored => {
                let state = self.view_states.get_or_default(&key);
                debug!(key = %key, ?state, "applying stored view state");
                self.viewport.apply_state(state, cw, ch);
            }
            PendingView::Reset => {
                debug!(key = %key, "resetting view state");
                self.viewport.reset();
                self.viewport.clamp_offsets(cw, ch);
            }
        }
        self.mark_full();
    }

    /// Replace the shown sheet with a newer snapshot of itself.
    pub fn update_sheet(&mut self, sheet: Arc<SheetInfo>) -> Invalidation {
        let Some(shown) = self.shown.as_mut() else {
            return Invalidation::None;
        };
        let diff = diff_tables(&shown.sheet.table_data, &sheet.table_data);
        let merges_changed = shown.sheet.merged_cells != sheet.merged_cells
            || shown.sheet.row_count != sheet.row_count
            || shown.sheet.max_cols != sheet.max_cols;
        let sheet_index = sheet.sheet_index;
        if merges_changed {
            shown.layout = SheetLayout::new(&sheet, self.config.cell_width, self.config.cell_height);
        }
        shown.sheet = sheet;
        self.edited = edited_positions(&shown.sheet);
        let invalidation = if merges_changed {
            Invalidation::Full
        } else {
            Invalidation::decide(
                &diff,
                shown.sheet.total_cells(),
                &shown.layout,
                &self.viewport,
            )
        };
        self.forget_changed_images(sheet_index, &diff);

        match invalidation {
            Invalidation::None => {}
            Invalidation::Partial(rect) => self.mark_dirty(rect),
            Invalidation::Full => self.mark_full(),
        }
        invalidation
    }

    fn forget_changed_images(&mut self, sheet_index: i32, diff: &TableDiff) {
        for change in &diff.changed_cells {
            let was_image = change.old_cell.as_ref().is_some_and(|c| c.cell_type.is_image());
            let value_changed = change.old_cell.as_ref().map(|c| &c.value)
                != change.new_cell.as_ref().map(|c| &c.value);
            if was_image && value_changed {
                self.images
                    .clear_cell(CellKey::new(sheet_index, change.row, change.col));
            }
        }
    }

    /// Selection outline target; `None` hides it.
    pub fn set_selection(&mut self, selection: Option<(usize, usize)>) {
        if self.selection != selection {
            self.selection = selection;
            self.mark_full();
        }
    }

    pub fn set_background_overrides(&mut self, overrides: &HashMap<(usize, usize), String>) {
        if &self.background_overrides != overrides {
            self.background_overrides = overrides.clone();
            self.mark_full();
        }
    }

    /// Forget every stored view state of `form_id`.
    pub fn clear_form_states(&mut self, form_id: i32) {
        self.view_states.clear_for_form(form_id);
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Cell a tap at screen `(x, y)` selects, resolved to the main cell.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        self.shown.as_ref()?.layout.hit_test(x, y, &self.viewport)
    }

    pub fn touch_down(&mut self, x: f32, y: f32) {
        self.gestures.touch_down(x, y);
    }

    /// Pan by the finger movement since the last sample.
    pub fn touch_move(&mut self, x: f32, y: f32) {
        if let Some((dx, dy)) = self.gestures.touch_move(x, y) {
            self.pan(dx, dy);
        }
    }

    /// End a touch; returns the tapped cell, if it was a tap.
    pub fn touch_up(&mut self, x: f32, y: f32, now_ms: f64) -> Option<(usize, usize)> {
        match self.gestures.touch_up(x, y, now_ms) {
            Gesture::Tap { x, y } => self.hit_test(x, y),
            Gesture::Drag => None,
        }
    }

    /// Pan by a screen-space distance.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let (cw, ch) = self.content_size();
        self.viewport.pan_by(dx, dy, cw, ch);
        self.mark_full();
    }

    /// Multiply the scale by a pinch step.
    pub fn pinch(&mut self, factor: f32, now_ms: f64) {
        self.gestures.pinch(now_ms);
        let (cw, ch) = self.content_size();
        self.viewport.zoom_by(factor, cw, ch);
        self.mark_full();
    }

    pub fn set_scale(&mut self, scale: f32) {
        let (cw, ch) = self.content_size();
        self.viewport.set_scale(scale, cw, ch);
        self.mark_full();
    }

    /// Absolute offsets, clamped to the content.
    pub fn set_offsets(&mut self, offset_x: f32, offset_y: f32) {
        let (cw, ch) = self.content_size();
        self.viewport.offset_x = offset_x;
        self.viewport.offset_y = offset_y;
        self.viewport.clamp_offsets(cw, ch);
        self.mark_full();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        let (cw, ch) = self.content_size();
        self.viewport.resize(width, height, cw, ch);
        self.mark_full();
    }

    /// Advance timers. Once scrolling settles, visible images start loading.
    ///
    /// Returns `true` when a redraw is wanted.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if self.gestures.tick(now_ms) {
            self.load_visible_images();
            self.mark_full();
            return true;
        }
        false
    }

    /// Apply finished image loads; returns whether any cell needs a redraw.
    pub fn pump(&mut self) -> bool {
        let redraw = self.images.pump();
        let Some(shown) = self.shown.as_ref() else {
            return false;
        };
        let mut any = false;
        let mut rects = Vec::new();
        for key in redraw {
            if key.sheet_index != shown.sheet.sheet_index {
                continue;
            }
            let rect = shown.layout.cell_rect(key.row, key.col);
            rects.push(self.viewport.rect_to_screen(&rect));
            any = true;
        }
        for rect in rects {
            self.mark_dirty(rect);
        }
        any
    }

    /// Start loads for visible image cells unless a gesture is in flight.
    pub fn load_visible_images(&mut self) -> usize {
        if self.gestures.is_scrolling() {
            return 0;
        }
        let Some(shown) = self.shown.as_ref() else {
            return 0;
        };
        let Some(range) = shown.layout.visible_range(&self.viewport) else {
            return 0;
        };
        self.images
            .update_visible_cells(&shown.sheet, &shown.layout, range)
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    /// Paint the whole view, then queue image loads for what was drawn.
    pub fn render(&mut self, surface: &mut dyn DrawSurface) -> PaintStats {
        self.render_region(surface, None)
    }

    /// Paint only what changed since the last frame.
    pub fn render_pending(&mut self, surface: &mut dyn DrawSurface) -> PaintStats {
        if self.needs_full_redraw {
            self.render_region(surface, None)
        } else if let Some(dirty) = self.dirty {
            self.render_region(surface, Some(dirty))
        } else {
            PaintStats::default()
        }
    }

    fn render_region(&mut self, surface: &mut dyn DrawSurface, dirty: Option<CellRect>) -> PaintStats {
        let Some(shown) = self.shown.as_ref() else {
            return PaintStats::default();
        };
        let params = RenderParams {
            sheet: &shown.sheet,
            layout: &shown.layout,
            viewport: &self.viewport,
            config: &self.config,
            selection: self.selection,
            background_overrides: &self.background_overrides,
            edited: &self.edited,
            images: Some(&self.images),
            dirty,
        };
        let stats = paint(surface, &params);
        self.needs_full_redraw = false;
        self.dirty = None;
        self.load_visible_images();
        stats
    }

    /// Give exhausted image cells another round of attempts.
    pub fn retry_failed_images(&mut self) -> usize {
        let count = self.images.retry_failed();
        if count > 0 {
            self.mark_full();
        }
        count
    }
}

fn edited_positions(sheet: &SheetInfo) -> HashSet<(usize, usize)> {
    sheet
        .table_data
        .iter()
        .enumerate()
        .flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, cell)| cell.is_edited)
                .map(move |(c, _)| (r, c))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::error::{FormGridError, Result};
    use crate::images::{ImageSource, InlineWorker};
    use crate::render::{Bitmap, DisplayList};
    use crate::types::Cell;

    struct NoImages;

    impl ImageProvider for NoImages {
        fn load_image(&self, source: &ImageSource) -> Result<Bitmap> {
            Err(FormGridError::ImageLoadFailed {
                source_uri: source.uri.clone(),
                reason: "offline".into(),
            })
        }
    }

    fn sheet(index: i32, name: &str, rows: usize, cols: usize) -> Arc<SheetInfo> {
        let data = (0..rows)
            .map(|r| (0..cols).map(|c| Cell::text(format!("{r},{c}"))).collect())
            .collect();
        Arc::new(SheetInfo::from_rows(index, name, data, Vec::new()))
    }

    fn view() -> TableView {
        TableView::new(
            TableConfig::default(),
            800.0,
            600.0,
            Arc::new(NoImages),
            Arc::new(InlineWorker),
        )
    }

    #[test]
    fn tab_round_trip_restores_state() {
        let mut v = view();
        let a = sheet(0, "A", 50, 20);
        let b = sheet(1, "B", 50, 20);
        v.show_sheet(7, a.clone());
        v.set_scale(1.5);
        v.set_offsets(-200.0, -100.0);
        let before = v.view_state();

        v.show_sheet(7, b);
        assert_eq!(v.view_state(), SheetViewState::default());
        v.show_sheet(7, a);
        assert_eq!(v.view_state(), before);
    }

    #[test]
    fn single_cell_update_is_partial() {
        let mut v = view();
        let s = sheet(0, "A", 20, 10);
        v.show_sheet(1, s.clone());
        let mut updated = (*s).clone();
        Arc::make_mut(&mut updated.table_data[3])[2] = Cell::text("changed");
        let inv = v.update_sheet(Arc::new(updated));
        assert_eq!(inv, Invalidation::Partial(CellRect::new(240.0, 180.0, 120.0, 60.0)));
    }

    #[test]
    fn same_snapshot_is_no_op() {
        let mut v = view();
        let s = sheet(0, "A", 5, 5);
        v.show_sheet(1, s.clone());
        assert_eq!(v.update_sheet(s), Invalidation::None);
    }

    #[test]
    fn pending_render_clears_dirty() {
        let mut v = view();
        v.show_sheet(1, sheet(0, "A", 5, 5));
        let mut list = DisplayList::new();
        let stats = v.render_pending(&mut list);
        assert_eq!(stats.cells, 25);
        assert!(!v.needs_redraw());
        list.clear();
        assert_eq!(v.render_pending(&mut list), PaintStats::default());
    }

    #[test]
    fn tap_hits_cell_under_finger() {
        let mut v = view();
        v.show_sheet(1, sheet(0, "A", 20, 20));
        v.set_scale(2.0);
        v.set_offsets(-120.0, 0.0);
        v.touch_down(250.0, 130.0);
        assert_eq!(v.touch_up(250.0, 130.0, 0.0), Some((1, 2)));
    }

    #[test]
    fn new_form_resets_to_stored_or_default() {
        let mut v = view();
        v.show_sheet(1, sheet(0, "A", 50, 50));
        v.set_scale(2.0);
        v.show_sheet(2, sheet(0, "A", 50, 50));
        assert_eq!(v.view_state().scale, 1.0);
        v.queue_reset();
        v.show_sheet(2, sheet(0, "A", 50, 50));
        assert_eq!(v.view_state(), SheetViewState::default());
    }
}
