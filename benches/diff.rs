//! Benchmarks for table diffing and painting.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.
#![allow(clippy::expect_used, clippy::indexing_slicing)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use formgrid::config::TableConfig;
use formgrid::diff::diff_tables;
use formgrid::layout::{SheetLayout, Viewport};
use formgrid::render::{paint, DisplayList, RenderParams};
use formgrid::{Cell, Row, SheetInfo};

fn table(rows: usize, cols: usize) -> Vec<Row> {
    (0..rows)
        .map(|r| Arc::new((0..cols).map(|c| Cell::text(format!("{r},{c}"))).collect()))
        .collect()
}

/// One edited cell against a shared snapshot: only one row is compared.
fn bench_single_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_single_edit");
    for rows in [100usize, 1_000, 10_000] {
        let old = table(rows, 20);
        let mut new = old.clone();
        Arc::make_mut(&mut new[rows / 2])[3] = Cell::text("edited");
        group.throughput(Throughput::Elements((rows * 20) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| diff_tables(black_box(&old), black_box(&new)))
        });
    }
    group.finish();
}

/// Fully rebuilt table: every row is compared cell by cell.
fn bench_full_rebuild(c: &mut Criterion) {
    let old = table(1_000, 20);
    let new = table(1_000, 20);
    c.bench_function("diff_full_rebuild_1000x20", |b| {
        b.iter(|| diff_tables(black_box(&old), black_box(&new)))
    });
}

fn bench_paint(c: &mut Criterion) {
    let rows = table(5_000, 20)
        .into_iter()
        .map(|r| r.as_ref().clone())
        .collect();
    let sheet = SheetInfo::from_rows(0, "Sheet1", rows, Vec::new());
    let config = TableConfig::default();
    let layout = SheetLayout::new(&sheet, config.cell_width, config.cell_height);
    let viewport = Viewport::new(1280.0, 800.0);
    let overrides = HashMap::new();
    let edited = HashSet::new();

    c.bench_function("paint_visible_5000x20", |b| {
        b.iter(|| {
            let mut list = DisplayList::new();
            let params = RenderParams {
                sheet: &sheet,
                layout: &layout,
                viewport: &viewport,
                config: &config,
                selection: Some((3, 2)),
                background_overrides: &overrides,
                edited: &edited,
                images: None,
                dirty: None,
            };
            paint(black_box(&mut list), &params)
        })
    });
}

criterion_group!(benches, bench_single_edit, bench_full_rebuild, bench_paint);
criterion_main!(benches);
