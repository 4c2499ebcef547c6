//! Table view configuration.
//!
//! Built in code with [`TableConfig::builder`] or deserialized from the JSON a
//! host passes across the wasm boundary. Missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::layout::{DEFAULT_CELL_HEIGHT, DEFAULT_CELL_WIDTH, MAX_SCALE, MIN_SCALE};
use crate::render::palette;

/// Default number of attempts per image before giving up
pub const DEFAULT_MAX_RETRY_COUNT: u32 = 3;

/// How a bitmap is fitted into its cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScaleType {
    /// Scale to fit entirely, preserving aspect ratio
    #[default]
    FitCenter,
    /// Scale to cover the cell, cropping the overflow
    CenterCrop,
    /// Like `FitCenter`, but never enlarge a small bitmap
    CenterInside,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableConfig {
    pub show_edited_cell_border: bool,
    pub edited_cell_border_color: String,
    pub image_scale_type: ScaleType,
    pub image_loading_color: String,
    pub image_loading_text: String,
    pub image_error_text: String,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub image_cache_enabled: bool,
    pub image_corner_radius: f32,
    pub max_retry_count: u32,
    /// Whether the host should focus the editor input when a cell opens
    pub focus_on_edit: bool,
    pub cell_width: f32,
    pub cell_height: f32,
    pub font_size: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            show_edited_cell_border: false,
            edited_cell_border_color: palette::EDITED_BORDER.to_string(),
            image_scale_type: ScaleType::FitCenter,
            image_loading_color: palette::IMAGE_LOADING.to_string(),
            image_loading_text: "Loading...".to_string(),
            image_error_text: "Error".to_string(),
            min_zoom: MIN_SCALE,
            max_zoom: MAX_SCALE,
            image_cache_enabled: true,
            image_corner_radius: 0.0,
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
            focus_on_edit: false,
            cell_width: DEFAULT_CELL_WIDTH,
            cell_height: DEFAULT_CELL_HEIGHT,
            font_size: 14.0,
        }
    }
}

impl TableConfig {
    pub fn builder() -> TableConfigBuilder {
        TableConfigBuilder::default()
    }

    /// Parse a JSON config, filling gaps with defaults.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Fluent builder for [`TableConfig`]
#[derive(Debug, Clone, Default)]
pub struct TableConfigBuilder {
    config: TableConfig,
}

impl TableConfigBuilder {
    #[must_use]
    pub fn show_edited_cell_border(mut self, show: bool) -> Self {
        self.config.show_edited_cell_border = show;
        self
    }

    #[must_use]
    pub fn edited_cell_border_color(mut self, color: impl Into<String>) -> Self {
        self.config.edited_cell_border_color = color.into();
        self
    }

    #[must_use]
    pub fn image_scale_type(mut self, scale_type: ScaleType) -> Self {
        self.config.image_scale_type = scale_type;
        self
    }

    #[must_use]
    pub fn image_loading_color(mut self, color: impl Into<String>) -> Self {
        self.config.image_loading_color = color.into();
        self
    }

    #[must_use]
    pub fn image_loading_text(mut self, text: impl Into<String>) -> Self {
        self.config.image_loading_text = text.into();
        self
    }

    #[must_use]
    pub fn image_error_text(mut self, text: impl Into<String>) -> Self {
        self.config.image_error_text = text.into();
        self
    }

    #[must_use]
    pub fn min_zoom(mut self, zoom: f32) -> Self {
        self.config.min_zoom = zoom;
        self
    }

    #[must_use]
    pub fn max_zoom(mut self, zoom: f32) -> Self {
        self.config.max_zoom = zoom;
        self
    }

    #[must_use]
    pub fn image_cache_enabled(mut self, enabled: bool) -> Self {
        self.config.image_cache_enabled = enabled;
        self
    }

    #[must_use]
    pub fn image_corner_radius(mut self, radius: f32) -> Self {
        self.config.image_corner_radius = radius;
        self
    }

    #[must_use]
    pub fn max_retry_count(mut self, count: u32) -> Self {
        self.config.max_retry_count = count;
        self
    }

    #[must_use]
    pub fn focus_on_edit(mut self, focus: bool) -> Self {
        self.config.focus_on_edit = focus;
        self
    }

    #[must_use]
    pub fn cell_size(mut self, width: f32, height: f32) -> Self {
        self.config.cell_width = width;
        self.config.cell_height = height;
        self
    }

    #[must_use]
    pub fn font_size(mut self, size: f32) -> Self {
        self.config.font_size = size;
        self
    }

    /// Finish, swapping an inverted zoom range.
    pub fn build(self) -> TableConfig {
        let mut config = self.config;
        if config.min_zoom > config.max_zoom {
            std::mem::swap(&mut config.min_zoom, &mut config.max_zoom);
        }
        config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = TableConfig::builder()
            .show_edited_cell_border(true)
            .max_retry_count(5)
            .image_scale_type(ScaleType::CenterCrop)
            .build();
        assert!(config.show_edited_cell_border);
        assert_eq!(config.max_retry_count, 5);
        assert_eq!(config.image_scale_type, ScaleType::CenterCrop);
        assert_eq!(config.edited_cell_border_color, "#10B981");
        assert_eq!(config.cell_width, 120.0);
    }

    #[test]
    fn json_fills_missing_fields() {
        let config =
            TableConfig::from_json(r#"{"showEditedCellBorder":true,"imageScaleType":"centerInside"}"#)
                .unwrap();
        assert!(config.show_edited_cell_border);
        assert_eq!(config.image_scale_type, ScaleType::CenterInside);
        assert_eq!(config.max_retry_count, DEFAULT_MAX_RETRY_COUNT);
        assert_eq!(config.image_loading_text, "Loading...");
    }

    #[test]
    fn inverted_zoom_range_is_swapped() {
        let config = TableConfig::builder().min_zoom(3.0).max_zoom(0.5).build();
        assert_eq!((config.min_zoom, config.max_zoom), (0.5, 3.0));
    }
}
