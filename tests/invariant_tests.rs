//! Properties that must hold for every form: merge consistency, selection
//! geometry, diff stability, silent no-op drafts, view-state round trips
//! and the image retry budget.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use std::sync::Arc;

use common::{
    asset_provider, fixture_editor, form, merge, merged_sheet, text_sheet, QueueWorker,
    UnreachableImages, VIEW_HEIGHT, VIEW_WIDTH,
};
use formgrid::config::TableConfig;
use formgrid::diff::{diff_tables, Invalidation};
use formgrid::layout::{SheetLayout, SheetViewState};
use formgrid::provider::DataProvider;
use formgrid::render::{palette, DisplayList};
use formgrid::viewmodel::{UpdateKind, ViewEvent};
use formgrid::{Cell, CellType, FormEditor, FormResponse, SheetInfo};
use test_case::test_case;

fn assert_merges_consistent(sheet: &SheetInfo) {
    for m in &sheet.merged_cells {
        let mut mains = 0;
        for r in m.min_row..=m.max_row {
            for c in m.min_col..=m.max_col {
                let cell = sheet.cell(r, c).expect("merged cell in bounds");
                assert!(cell.merged, "{}: ({r},{c}) not flagged merged", m.id);
                if cell.is_main_cell {
                    mains += 1;
                }
            }
        }
        assert_eq!(mains, 1, "{}: expected exactly one main cell", m.id);
    }
}

fn five_merge_sheet() -> SheetInfo {
    merged_sheet(
        0,
        "Merged",
        8,
        6,
        vec![merge("a", 0, 0, 2, 0), merge("b", 0, 1, 0, 3), merge("c", 4, 2, 6, 5)],
    )
}

// ============================================================================
// Merge consistency
// ============================================================================

#[test_case(1 ; "mock form")]
#[test_case(3 ; "recorded inspection form")]
fn provider_forms_have_consistent_merges(form_id: i32) {
    let form = asset_provider().get_form_data(form_id).unwrap();
    for sheet in form.sheets() {
        assert_merges_consistent(sheet);
    }
}

#[test]
fn built_sheets_have_consistent_merges() {
    assert_merges_consistent(&five_merge_sheet());
}

#[test]
fn merge_past_sheet_edge_loads_clamped() {
    let mut sheet = text_sheet(0, "Oversized", 4, 3);
    sheet.merged_cells.push(merge("huge", 1, 1, 1_000_000_000, 1_000_000_000));
    assert!(sheet.validate().is_err());

    let mut editor = fixture_editor();
    editor.load_response(form(42, vec![sheet])).unwrap();
    let layout = editor.view().layout().unwrap();
    assert_eq!(layout.merge_boxes().len(), 1);
    assert_eq!(layout.merge_boxes()[0].bottom(), 4.0 * layout.cell_height);
    assert!(layout.should_skip_cell(3, 2));
}

// ============================================================================
// Selection geometry
// ============================================================================

#[test_case(0, 0, (0, 0) ; "main cell of vertical merge")]
#[test_case(2, 0, (0, 0) ; "bottom of vertical merge")]
#[test_case(0, 3, (0, 1) ; "right end of horizontal merge")]
#[test_case(6, 5, (4, 2) ; "interior corner of block merge")]
#[test_case(3, 4, (3, 4) ; "unmerged cell")]
fn selection_outline_covers_main_cell(row: usize, col: usize, main: (usize, usize)) {
    let sheet = five_merge_sheet();
    let layout = SheetLayout::new(&sheet, 120.0, 60.0);
    let mut editor = fixture_editor();
    editor.load_response(form(40, vec![sheet])).unwrap();
    editor.select_cell(row, col).unwrap();
    assert_eq!(editor.model().selection().unwrap().position(), main);

    let mut list = DisplayList::new();
    editor.render(&mut list);
    assert_eq!(
        list.strokes_with(palette::SELECTION),
        vec![layout.cell_rect(main.0, main.1)]
    );
}

// ============================================================================
// Diff stability
// ============================================================================

#[test_case(1 ; "mock form")]
#[test_case(3 ; "recorded inspection form")]
fn loading_the_same_form_twice_diffs_empty(form_id: i32) {
    let provider = asset_provider();
    let first = provider.get_form_data(form_id).unwrap();
    let second = provider.get_form_data(form_id).unwrap();
    for (a, b) in first.sheets().iter().zip(second.sheets()) {
        let diff = diff_tables(&a.table_data, &b.table_data);
        assert!(diff.is_empty(), "sheet {} changed", a.sheet_name);
    }
}

#[test]
fn redisplaying_identical_snapshot_needs_no_redraw() {
    let mut editor = fixture_editor();
    editor.load_form(3).unwrap();
    let copy = Arc::new(editor.model().current_sheet().unwrap().as_ref().clone());
    assert_eq!(editor.view_mut().update_sheet(copy), Invalidation::None);
}

// ============================================================================
// Silent no-op drafts
// ============================================================================

#[test_case(&["A"] ; "untouched")]
#[test_case(&["AB", "A"] ; "typed then erased")]
#[test_case(&["", "A"] ; "cleared then restored")]
#[test_case(&["Ax", "A", "A"] ; "repeated original")]
fn drafts_equal_to_original_emit_nothing(keystrokes: &[&str]) {
    let mut editor = fixture_editor();
    editor.load_form(3).unwrap();
    editor.select_cell(2, 1).unwrap();

    let mut events: Vec<ViewEvent> = Vec::new();
    for (i, draft) in keystrokes.iter().enumerate() {
        editor.type_draft(draft, i as f64 * 5.0);
    }
    editor.tick(1_000.0).unwrap();
    events.extend(editor.confirm_edit().unwrap());

    assert!(!events
        .iter()
        .any(|e| matches!(e, ViewEvent::CellUpdate { kind: UpdateKind::Content, .. })));
    let cell = editor.model().current_sheet().unwrap().cell(2, 1).unwrap().clone();
    assert_eq!(cell.value, "A");
    assert!(!cell.is_edited);
}

// ============================================================================
// View-state round trips
// ============================================================================

#[test_case(1.0, 0.0, 0.0 ; "untouched")]
#[test_case(1.5, -200.0, -100.0 ; "zoomed and panned")]
#[test_case(0.5, 0.0, 0.0 ; "minimum zoom")]
#[test_case(3.0, -2_000.0, -1_500.0 ; "maximum zoom deep pan")]
fn tab_round_trip_restores_view(scale: f32, offset_x: f32, offset_y: f32) {
    let mut editor = fixture_editor();
    let sheets = vec![
        text_sheet(0, "A", 80, 40),
        text_sheet(1, "B", 10, 4),
        text_sheet(2, "C", 80, 40),
    ];
    editor.load_response(form(50, sheets)).unwrap();
    editor.view_mut().set_scale(scale);
    editor.view_mut().set_offsets(offset_x, offset_y);
    let before = editor.view().view_state();
    assert_eq!(
        before,
        SheetViewState {
            scale,
            offset_x,
            offset_y
        }
    );

    editor.switch_sheet(1).unwrap();
    editor.view_mut().set_scale(2.0);
    editor.switch_sheet(2).unwrap();
    editor.switch_sheet(0).unwrap();
    assert_eq!(editor.view().view_state(), before);
}

#[test]
fn switching_forms_drops_old_view_states() {
    let mut editor = fixture_editor();
    editor
        .load_response(form(60, vec![text_sheet(0, "A", 80, 40), text_sheet(1, "B", 80, 40)]))
        .unwrap();
    editor.view_mut().set_scale(2.0);
    editor.switch_sheet(1).unwrap();
    assert_eq!(editor.view().view_states().len(), 1);

    editor
        .load_response(form(61, vec![text_sheet(0, "A", 80, 40)]))
        .unwrap();
    assert_eq!(editor.view().view_state(), SheetViewState::default());
    assert_eq!(editor.view().view_states().len(), 0);
}

#[test]
fn reloading_same_form_keeps_view_states() {
    let mut editor = fixture_editor();
    let sheets = || vec![text_sheet(0, "A", 80, 40), text_sheet(1, "B", 80, 40)];
    editor.load_response(form(62, sheets())).unwrap();
    editor.view_mut().set_scale(2.0);
    editor.switch_sheet(1).unwrap();

    let hint = editor.refresh_hint();
    editor.reload_response(form(62, sheets()), &hint).unwrap();
    assert!(!editor.view().view_states().is_empty());

    editor.switch_sheet(0).unwrap();
    assert_eq!(editor.view().view_state().scale, 2.0);
}

// ============================================================================
// Image retry budget
// ============================================================================

fn image_form() -> FormResponse {
    let rows = vec![vec![
        Cell::with_type(CellType::Image, "https://unreachable.invalid/a.png"),
        Cell::with_type(CellType::ReadOnlyImage, "https://unreachable.invalid/b.png"),
    ]];
    form(70, vec![SheetInfo::from_rows(0, "Photos", rows, Vec::new())])
}

#[test_case(1 ; "single attempt")]
#[test_case(3 ; "default budget")]
#[test_case(5 ; "generous budget")]
fn no_fetches_after_retry_budget(max_retries: u32) {
    let images = Arc::new(UnreachableImages::default());
    let worker = Arc::new(QueueWorker::default());
    let config = TableConfig::builder().max_retry_count(max_retries).build();
    let mut editor = FormEditor::new(
        Box::new(asset_provider()),
        images.clone(),
        worker.clone(),
        config,
        VIEW_WIDTH,
        VIEW_HEIGHT,
    );
    editor.load_response(image_form()).unwrap();

    let mut list = DisplayList::new();
    for _ in 0..(max_retries + 4) {
        editor.render(&mut list);
        worker.run_all();
        editor.tick(0.0).unwrap();
    }
    assert_eq!(images.attempts(), 2 * max_retries as usize);

    // Only a reload grants a new budget
    let hint = editor.refresh_hint();
    editor.reload_response(image_form(), &hint).unwrap();
    editor.render(&mut list);
    assert_eq!(worker.run_all(), 2);
}
