//! CLI tool for formgrid - applies edits to a form envelope and prints the
//! edited cells as JSON
//!
//! Usage:
//!   formgrid_cli <form.json>                              # Edited cells (none yet)
//!   formgrid_cli <form.json> --edit 2,1=B --bgc 0,0=#FF0000
//!   formgrid_cli <form.json> --sheet 1 --edit 0,0=x
//!   formgrid_cli <form.json> --render                     # Display list JSON
//!
//! Set RUST_LOG=formgrid=debug for tracing output on stderr.

#![allow(clippy::exit)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use formgrid::images::ThreadWorker;
use formgrid::provider::{parse_envelope, AssetDataProvider, FileImageProvider};
use formgrid::render::DisplayList;
use formgrid::{FormEditor, TableConfig};
use tracing_subscriber::EnvFilter;

enum Op {
    Edit(usize, usize, String),
    Background(usize, usize, String),
}

fn parse_target(arg: &str) -> Option<(usize, usize, String)> {
    let (pos, value) = arg.split_once('=')?;
    let (r, c) = pos.split_once(',')?;
    Some((r.trim().parse().ok()?, c.trim().parse().ok()?, value.to_string()))
}

fn usage() -> ! {
    eprintln!(
        "Usage: formgrid_cli <form.json> [--sheet N] [--edit r,c=value]... [--bgc r,c=#RRGGBB]... [--render]"
    );
    std::process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }
    let input_path = &args[1];

    let mut ops = Vec::new();
    let mut sheet = None;
    let mut render = false;
    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--render" => render = true,
            "--sheet" => {
                let value = rest.next().unwrap_or_else(|| usage());
                sheet = Some(value.parse::<usize>().unwrap_or_else(|_| usage()));
            }
            flag @ ("--edit" | "--bgc") => {
                let value = rest.next().unwrap_or_else(|| usage());
                let Some((r, c, v)) = parse_target(value) else {
                    eprintln!("Bad cell target: {value}");
                    std::process::exit(1);
                };
                ops.push(if flag == "--edit" {
                    Op::Edit(r, c, v)
                } else {
                    Op::Background(r, c, v)
                });
            }
            other => {
                eprintln!("Unknown argument: {other}");
                usage();
            }
        }
    }

    let json = match fs::read_to_string(input_path) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error reading {}: {}", input_path, e);
            std::process::exit(1);
        }
    };
    let form = match parse_envelope(&json) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error parsing form: {}", e);
            std::process::exit(1);
        }
    };

    let base_dir = Path::new(input_path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut editor = FormEditor::new(
        Box::new(AssetDataProvider::new(&base_dir)),
        Arc::new(FileImageProvider::with_resource_dir(&base_dir)),
        Arc::new(ThreadWorker),
        TableConfig::default(),
        1280.0,
        800.0,
    );
    if let Err(e) = editor.load_response(form) {
        eprintln!("Error loading form: {}", e);
        std::process::exit(1);
    }
    if let Some(position) = sheet {
        if let Err(e) = editor.switch_sheet(position) {
            eprintln!("Error switching sheet: {}", e);
            std::process::exit(1);
        }
    }

    for op in ops {
        let result = match &op {
            Op::Edit(r, c, v) => editor.update_cell_content(*r, *c, v),
            Op::Background(r, c, v) => editor.set_cell_background(*r, *c, v),
        };
        if let Err(e) = result {
            eprintln!("Error applying edit: {}", e);
            std::process::exit(1);
        }
    }

    let output = if render {
        let mut list = DisplayList::new();
        let stats = editor.render(&mut list);
        eprintln!(
            "Painted {} cells, {} images, {} merged backgrounds",
            stats.cells, stats.images, stats.merged_backgrounds
        );
        list.to_json().unwrap()
    } else {
        editor.edited_cells_json().unwrap()
    };
    println!("{output}");
}
