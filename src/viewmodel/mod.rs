//! Form view-model.
//!
//! Owns the loaded [`FormResponse`], the current sheet, the selection and the
//! edit draft. Every mutation updates data first and then emits a
//! [`ViewEvent`]; the host drains the queue or registers listeners.
//!
//! Sheets and rows are `Arc`-shared. An edit copies one sheet header, one row
//! and one cell; everything else stays shared with earlier snapshots, so a
//! view holding the previous sheet can diff cheaply.

mod events;
mod state;

pub use events::{SheetRefreshState, UpdateKind, ViewEvent};
pub use state::LoadState;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::{FormGridError, Result};
use crate::input::{Debouncer, PendingCommit};
use crate::provider::DataProvider;
use crate::types::{position_key, Cell, CellType, FormResponse, Selection, SheetInfo};

/// Step applied by the zoom buttons
pub const ZOOM_STEP: f32 = 0.2;
/// Lower bound of the button-driven scale factor
pub const MIN_SCALE_FACTOR: f32 = 0.7;
/// Upper bound of the button-driven scale factor
pub const MAX_SCALE_FACTOR: f32 = 2.8;

/// Edited cells grouped by `sheetIndex`, then by `"row,col"`.
pub type EditedCells = BTreeMap<i32, BTreeMap<String, Cell>>;

type Listener = Box<dyn FnMut(&ViewEvent)>;

pub struct FormViewModel {
    provider: Box<dyn DataProvider>,
    response: Option<FormResponse>,
    current_sheet: usize,
    selection: Option<Selection>,
    is_editing: bool,
    scale_factor: f32,
    is_loading: bool,
    editing_draft: String,
    original_cell: Option<Cell>,
    background_overrides: HashMap<(usize, usize), String>,
    load_state: LoadState,
    debouncer: Debouncer,
    events: VecDeque<ViewEvent>,
    listeners: Vec<Listener>,
}

impl FormViewModel {
    pub fn new(provider: Box<dyn DataProvider>) -> Self {
        Self {
            provider,
            response: None,
            current_sheet: 0,
            selection: None,
            is_editing: false,
            scale_factor: 1.0,
            is_loading: false,
            editing_draft: String::new(),
            original_cell: None,
            background_overrides: HashMap::new(),
            load_state: LoadState::NoData,
            debouncer: Debouncer::default(),
            events: VecDeque::new(),
            listeners: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Register a callback run for every emitted event.
    pub fn subscribe(&mut self, listener: impl FnMut(&ViewEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Take all queued events in emission order.
    pub fn drain_events(&mut self) -> Vec<ViewEvent> {
        self.events.drain(..).collect()
    }

    fn emit(&mut self, event: ViewEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
        self.events.push_back(event);
    }

    fn report(&mut self, err: FormGridError) -> FormGridError {
        match &err {
            FormGridError::CellNotFound { .. } => warn!(error = %err, "dropping mutation"),
            _ => error!(error = %err, "view-model operation failed"),
        }
        self.emit(ViewEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        });
        err
    }

    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
        self.emit(ViewEvent::Loading(loading));
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn response(&self) -> Option<&FormResponse> {
        self.response.as_ref()
    }

    pub fn form_id(&self) -> Option<i32> {
        self.response.as_ref().map(|r| r.id)
    }

    /// Position of the shown sheet in the form's sheet list.
    pub fn current_position(&self) -> usize {
        self.current_sheet
    }

    pub fn current_sheet(&self) -> Option<&Arc<SheetInfo>> {
        self.response.as_ref()?.excel_info.get(self.current_sheet)
    }

    pub fn sheet_by_index(&self, sheet_index: i32) -> Option<&Arc<SheetInfo>> {
        let response = self.response.as_ref()?;
        response.excel_info.get(response.position_by_index(sheet_index)?)
    }

    pub fn sheet_by_name(&self, sheet_name: &str) -> Option<&Arc<SheetInfo>> {
        let response = self.response.as_ref()?;
        response.excel_info.get(response.position_by_name(sheet_name)?)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.is_editing
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn draft(&self) -> &str {
        &self.editing_draft
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    /// Transient view-only background colors of the current sheet.
    pub fn background_overrides(&self) -> &HashMap<(usize, usize), String> {
        &self.background_overrides
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    fn fetch(&mut self, form_id: i32) -> Result<FormResponse> {
        self.set_loading(true);
        self.load_state.begin_loading();
        let result = self.provider.get_form_data(form_id).and_then(|form| {
            if form.excel_info.is_empty() {
                Err(FormGridError::DataFailure(format!(
                    "form {form_id} has no sheets"
                )))
            } else {
                Ok(form)
            }
        });
        self.set_loading(false);
        result.map_err(|e| self.fail_load(e))
    }

    fn fail_load(&mut self, err: FormGridError) -> FormGridError {
        let err = match err {
            FormGridError::DataFailure(_) => err,
            other => FormGridError::DataFailure(other.to_string()),
        };
        self.load_state.fail(err.to_string());
        self.report(err)
    }

    /// Load a form from the provider and show its first sheet.
    ///
    /// On failure the previous form stays loaded.
    pub fn load_form(&mut self, form_id: i32) -> Result<()> {
        let form = self.fetch(form_id)?;
        self.install(form, 0);
        Ok(())
    }

    /// Load a form delivered by the host.
    pub fn load_response(&mut self, form: FormResponse) -> Result<()> {
        self.set_loading(true);
        self.load_state.begin_loading();
        self.set_loading(false);
        if form.excel_info.is_empty() {
            let err = FormGridError::DataFailure(format!("form {} has no sheets", form.id));
            return Err(self.fail_load(err));
        }
        self.install(form, 0);
        Ok(())
    }

    /// Reload a form, staying on the sheet named by `hint` when it still exists.
    pub fn reload_form(&mut self, form_id: i32, hint: &SheetRefreshState) -> Result<()> {
        let form = self.fetch(form_id)?;
        self.reinstall(form, hint);
        Ok(())
    }

    /// Reload from a form delivered by the host.
    pub fn reload_response(&mut self, form: FormResponse, hint: &SheetRefreshState) -> Result<()> {
        self.set_loading(true);
        self.load_state.begin_loading();
        self.set_loading(false);
        if form.excel_info.is_empty() {
            self.emit(ViewEvent::ViewStateReset);
            let err = FormGridError::DataFailure(format!("form {} has no sheets", form.id));
            return Err(self.fail_load(err));
        }
        self.reinstall(form, hint);
        Ok(())
    }

    fn reinstall(&mut self, form: FormResponse, hint: &SheetRefreshState) {
        let matched = form
            .position_by_index(hint.sheet_index)
            .inspect(|_| debug!(sheet_index = hint.sheet_index, "reload matched sheet by index"))
            .or_else(|| {
                form.position_by_name(&hint.sheet_name)
                    .inspect(|_| debug!(sheet_name = %hint.sheet_name, "reload matched sheet by name"))
            });

        let restore = match matched.and_then(|p| form.excel_info.get(p).map(|s| (p, s))) {
            Some((position, sheet)) => Some((
                position,
                ViewEvent::ViewStateRestore {
                    scale: hint.scale,
                    offset_x: hint.offset_x,
                    offset_y: hint.offset_y,
                    sheet_index: sheet.sheet_index,
                    sheet_name: sheet.sheet_name.clone(),
                },
            )),
            None => {
                debug!("reload found no matching sheet, falling back to the first");
                None
            }
        };

        match restore {
            Some((position, event)) => {
                self.reset_session(form);
                self.emit(event);
                self.show(position);
            }
            None => {
                self.reset_session(form);
                self.emit(ViewEvent::ViewStateReset);
                self.show(0);
            }
        }
    }

    fn install(&mut self, form: FormResponse, position: usize) {
        self.reset_session(form);
        self.show(position);
    }

    fn reset_session(&mut self, form: FormResponse) {
        self.debouncer.cancel();
        let was_editing = self.is_editing;
        self.selection = None;
        self.is_editing = false;
        self.editing_draft.clear();
        self.original_cell = None;
        self.background_overrides.clear();
        self.response = Some(form);
        if was_editing {
            self.emit(ViewEvent::EditorClosed);
        }
    }

    fn show(&mut self, position: usize) {
        self.current_sheet = position;
        self.load_state.finish(position);
        let name = self
            .current_sheet()
            .map(|s| s.sheet_name.clone())
            .unwrap_or_default();
        self.emit(ViewEvent::SheetSwitch {
            index: position,
            name,
        });
    }

    /// Tab selection.
    pub fn switch_sheet(&mut self, position: usize) -> Result<()> {
        let count = self.response.as_ref().map_or(0, |r| r.excel_info.len());
        if position >= count {
            return Err(self.report(FormGridError::InvalidSheet(position)));
        }
        if position == self.current_sheet {
            return Ok(());
        }
        self.close_editor();
        self.background_overrides.clear();
        self.current_sheet = position;
        self.load_state.select(position);
        let name = self
            .current_sheet()
            .map(|s| s.sheet_name.clone())
            .unwrap_or_default();
        self.emit(ViewEvent::SheetSwitch {
            index: position,
            name,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Selection and drafts
    // ------------------------------------------------------------------

    /// Open the editor on a cell; merged children resolve to their main cell.
    pub fn select_cell(&mut self, row: usize, col: usize) -> Result<()> {
        let Some(sheet) = self.current_sheet().cloned() else {
            return Err(self.report(FormGridError::DataFailure("no form loaded".into())));
        };
        if !sheet.in_bounds(row, col) {
            return Err(self.report(FormGridError::CellNotFound { row, col }));
        }
        let (main_row, main_col) = sheet.resolve_main(row, col);
        let Some(cell) = sheet.cell(main_row, main_col).cloned() else {
            return Err(self.report(FormGridError::CellNotFound { row, col }));
        };
        self.debouncer.cancel();
        let merge = sheet.merge_at(main_row, main_col).cloned();
        let read_only = !cell.cell_type.is_editable();
        self.original_cell = Some(cell.clone());
        self.editing_draft = cell.value.clone();
        self.selection = Some(Selection::new(main_row, main_col, cell, merge));
        self.is_editing = true;
        self.emit(ViewEvent::EditorOpened {
            row: main_row,
            col: main_col,
            read_only,
        });
        Ok(())
    }

    pub fn update_draft(&mut self, draft: impl Into<String>) {
        self.editing_draft = draft.into();
    }

    /// Insert `symbol` at char position `cursor` (end when `None`); returns
    /// the cursor after the inserted symbol.
    pub fn insert_symbol(&mut self, symbol: &str, cursor: Option<usize>) -> usize {
        let len = self.editing_draft.chars().count();
        let at = cursor.unwrap_or(len).min(len);
        let byte = self
            .editing_draft
            .char_indices()
            .nth(at)
            .map_or(self.editing_draft.len(), |(i, _)| i);
        self.editing_draft.insert_str(byte, symbol);
        at + symbol.chars().count()
    }

    /// Keystroke in the editor: update the draft and schedule a commit.
    pub fn type_draft(&mut self, draft: impl Into<String>, now_ms: f64) {
        self.editing_draft = draft.into();
        if let Some(selection) = &self.selection {
            self.debouncer
                .schedule(selection.row, selection.col, self.editing_draft.clone(), now_ms);
        }
    }

    /// Commit a due debounced draft. Returns whether a commit ran.
    pub fn poll_commit(&mut self, now_ms: f64) -> Result<bool> {
        match self.debouncer.poll(now_ms) {
            Some(commit) => self.commit(commit),
            None => Ok(false),
        }
    }

    /// Commit any pending debounced draft immediately.
    pub fn flush_commit(&mut self) -> Result<bool> {
        match self.debouncer.flush() {
            Some(commit) => self.commit(commit),
            None => Ok(false),
        }
    }

    fn commit(&mut self, commit: PendingCommit) -> Result<bool> {
        self.update_cell_content(commit.row, commit.col, &commit.value)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Replace one cell of the current sheet, copying only what changes.
    ///
    /// `edit` returns `None` for "no change". Disabled cells are never
    /// written.
    fn write_cell(
        &mut self,
        row: usize,
        col: usize,
        edit: impl FnOnce(&Cell) -> Option<Cell>,
    ) -> Result<bool> {
        let position = self.current_sheet;
        let Some(response) = self.response.as_mut() else {
            return Err(FormGridError::DataFailure("no form loaded".into()));
        };
        let sheet = response
            .excel_info
            .get_mut(position)
            .ok_or(FormGridError::InvalidSheet(position))?;
        let current = sheet
            .cell(row, col)
            .ok_or(FormGridError::CellNotFound { row, col })?;
        if current.cell_type == CellType::Disabled {
            warn!(row, col, "ignoring edit of a disabled cell");
            return Ok(false);
        }
        let Some(updated) = edit(current) else {
            return Ok(false);
        };

        let sheet = Arc::make_mut(sheet);
        let cells = sheet
            .table_data
            .get_mut(row)
            .ok_or(FormGridError::CellNotFound { row, col })?;
        let slot = Arc::make_mut(cells)
            .get_mut(col)
            .ok_or(FormGridError::CellNotFound { row, col })?;
        *slot = updated;
        Ok(true)
    }

    fn write_and_emit(
        &mut self,
        row: usize,
        col: usize,
        kind: UpdateKind,
        edit: impl FnOnce(&Cell) -> Option<Cell>,
    ) -> Result<bool> {
        match self.write_cell(row, col, edit) {
            Ok(true) => {
                self.emit(ViewEvent::CellUpdate { row, col, kind });
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => Err(self.report(e)),
        }
    }

    fn original_value(&self) -> &str {
        self.original_cell.as_ref().map_or("", |c| c.value.as_str())
    }

    /// Write the draft into the cell unless it equals the value captured at
    /// selection.
    pub fn apply_draft(&mut self, row: usize, col: usize) -> Result<bool> {
        if self.editing_draft == self.original_value() {
            return Ok(false);
        }
        let draft = self.editing_draft.clone();
        self.write_and_emit(row, col, UpdateKind::Content, |cell| {
            (cell.value != draft || !cell.is_edited).then(|| cell.copy_with_edit(&draft))
        })
    }

    /// Typing-path write; same comparison as [`Self::apply_draft`].
    pub fn update_cell_content(&mut self, row: usize, col: usize, value: &str) -> Result<bool> {
        if value == self.original_value() {
            return Ok(false);
        }
        self.write_and_emit(row, col, UpdateKind::Content, |cell| {
            (cell.value != value || !cell.is_edited).then(|| cell.copy_with_edit(value))
        })
    }

    /// Persisted background color; empty string means none.
    pub fn update_cell_background_color_string(
        &mut self,
        row: usize,
        col: usize,
        color: &str,
    ) -> Result<bool> {
        self.write_and_emit(row, col, UpdateKind::Background, |cell| {
            (cell.bgc.as_deref().unwrap_or("") != color).then(|| cell.copy_with_background(color))
        })
    }

    /// View-only background color; not part of the form data.
    pub fn set_background_override(&mut self, row: usize, col: usize, color: &str) -> Result<bool> {
        let in_bounds = self
            .current_sheet()
            .is_some_and(|sheet| sheet.in_bounds(row, col));
        if !in_bounds {
            return Err(self.report(FormGridError::CellNotFound { row, col }));
        }
        if self.background_overrides.get(&(row, col)).map(String::as_str) == Some(color) {
            return Ok(false);
        }
        self.background_overrides.insert((row, col), color.to_string());
        self.emit(ViewEvent::CellUpdate {
            row,
            col,
            kind: UpdateKind::Background,
        });
        Ok(true)
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.set_scale_factor(self.scale_factor + ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.set_scale_factor(self.scale_factor - ZOOM_STEP)
    }

    fn set_scale_factor(&mut self, scale: f32) -> f32 {
        let scale = scale.clamp(MIN_SCALE_FACTOR, MAX_SCALE_FACTOR);
        if (scale - self.scale_factor).abs() > f32::EPSILON {
            self.scale_factor = scale;
            self.emit(ViewEvent::ScaleChanged(scale));
        }
        self.scale_factor
    }

    pub fn close_editor(&mut self) {
        self.debouncer.cancel();
        let was_editing = self.is_editing;
        self.is_editing = false;
        self.selection = None;
        self.editing_draft.clear();
        self.original_cell = None;
        if was_editing {
            self.emit(ViewEvent::EditorClosed);
        }
    }

    // ------------------------------------------------------------------
    // Edited cells
    // ------------------------------------------------------------------

    /// Every cell with `isEdited`, across all sheets.
    pub fn edited_cells(&self) -> EditedCells {
        let mut result = EditedCells::new();
        let Some(response) = &self.response else {
            return result;
        };
        for sheet in response.sheets() {
            for (r, row) in sheet.table_data.iter().enumerate() {
                for (c, cell) in row.iter().enumerate().filter(|(_, cell)| cell.is_edited) {
                    result
                        .entry(sheet.sheet_index)
                        .or_default()
                        .insert(position_key(r, c), cell.clone());
                }
            }
        }
        result
    }

    pub fn edited_cells_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.edited_cells())?)
    }

    /// Collect edited cells, then clear their flags.
    pub fn edited_cells_and_reset(&mut self) -> EditedCells {
        let edited = self.edited_cells();
        let current_index = self.current_sheet().map(|s| s.sheet_index);
        let mut cleared = Vec::new();
        if let Some(response) = self.response.as_mut() {
            for sheet in &mut response.excel_info {
                let Some(cells) = edited.get(&sheet.sheet_index) else {
                    continue;
                };
                let is_current = Some(sheet.sheet_index) == current_index;
                let sheet = Arc::make_mut(sheet);
                for key in cells.keys() {
                    let Some((r, c)) = parse_position(key) else {
                        continue;
                    };
                    let cell = sheet
                        .table_data
                        .get_mut(r)
                        .and_then(|row| Arc::make_mut(row).get_mut(c));
                    if let Some(cell) = cell {
                        cell.is_edited = false;
                        if is_current {
                            cleared.push((r, c));
                        }
                    }
                }
            }
        }
        for (row, col) in cleared {
            self.emit(ViewEvent::CellUpdate {
                row,
                col,
                kind: UpdateKind::All,
            });
        }
        edited
    }
}

fn parse_position(key: &str) -> Option<(usize, usize)> {
    let (r, c) = key.split_once(',')?;
    Some((r.parse().ok()?, c.parse().ok()?))
}
