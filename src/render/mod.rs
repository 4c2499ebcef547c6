//! Rendering engine with pluggable draw surfaces.
//!
//! This module provides:
//! - The `DrawSurface` trait and per-frame `RenderParams`
//! - The painter that turns a sheet into draw calls
//! - A recording `DisplayList` surface and, on wasm32, a Canvas 2D surface
//! - Color parsing and the byte-budgeted bitmap cache

pub mod backend;
pub mod cache;
#[cfg(target_arch = "wasm32")]
pub mod canvas;
pub mod colors;
pub mod display_list;
pub mod painter;

pub use backend::{Bitmap, DrawSurface, RenderParams, TextBaseline, TextStyle};
pub use cache::{LruCache, Weighted, DEFAULT_IMAGE_CACHE_BYTES};
#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasSurface;
pub use colors::{cell_type_background, palette, parse_color, CssColor};
pub use display_list::{DisplayList, DrawCommand};
pub use painter::{paint, resolve_background, PaintStats};
