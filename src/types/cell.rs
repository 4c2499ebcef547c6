use serde::{Deserialize, Deserializer, Serialize};

/// What kind of content a cell holds and how it is edited.
///
/// Serialized as the integer code used by the form payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum CellType {
    #[default]
    Text,
    Average,
    Option,
    Range,
    Image,
    Signature,
    Disabled,
    Search,
    ReadOnlyImage,
}

impl CellType {
    /// Payload code for this type.
    pub fn code(self) -> i64 {
        match self {
            Self::Text => 1,
            Self::Average => 2,
            Self::Option => 3,
            Self::Range => 4,
            Self::Image => 5,
            Self::Signature => 6,
            Self::Disabled => 7,
            Self::Search => 8,
            Self::ReadOnlyImage => 9,
        }
    }

    /// Image cells resolve their value through the image provider.
    pub fn is_image(self) -> bool {
        matches!(self, Self::Image | Self::ReadOnlyImage)
    }

    /// Cells drawn as centered text.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            Self::Text | Self::Average | Self::Option | Self::Range | Self::Search
        )
    }

    pub fn is_editable(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl From<i64> for CellType {
    fn from(code: i64) -> Self {
        match code {
            1 => Self::Text,
            2 => Self::Average,
            3 => Self::Option,
            4 => Self::Range,
            5 => Self::Image,
            6 => Self::Signature,
            7 => Self::Disabled,
            8 => Self::Search,
            9 => Self::ReadOnlyImage,
            other => {
                tracing::warn!(code = other, "unknown cell type, treating as text");
                Self::Text
            }
        }
    }
}

impl From<CellType> for i64 {
    fn from(t: CellType) -> Self {
        t.code()
    }
}

/// A single logical slot in a sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    #[serde(default = "one")]
    pub colspan: u32,
    #[serde(default = "one")]
    pub rowspan: u32,
    #[serde(default)]
    pub cell_type: CellType,
    #[serde(default)]
    pub value: String,
    /// Option-list entries. Non-string JSON entries are stringified.
    #[serde(default, deserialize_with = "deserialize_options")]
    pub option: Vec<String>,
    /// Background color string (e.g. `#FFEBEE`); empty or `"white"` means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgc: Option<String>,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub is_main_cell: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_id: Option<String>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub original_row: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_index: Option<i64>,
}

fn one() -> u32 {
    1
}

fn deserialize_options<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

impl Default for Cell {
    fn default() -> Self {
        Self::text("")
    }
}

impl Cell {
    /// A plain, unmerged text cell.
    pub fn text(value: impl Into<String>) -> Self {
        Self::with_type(CellType::Text, value)
    }

    /// A plain, unmerged cell of the given type.
    pub fn with_type(cell_type: CellType, value: impl Into<String>) -> Self {
        Self {
            colspan: 1,
            rowspan: 1,
            cell_type,
            value: value.into(),
            option: Vec::new(),
            bgc: None,
            merged: false,
            is_main_cell: false,
            merge_id: None,
            is_edited: false,
            original_row: true,
            row_index: None,
            col_index: None,
        }
    }

    /// Copy with a new value, marked as edited.
    #[must_use]
    pub fn copy_with_edit(&self, new_value: &str) -> Self {
        Self {
            value: new_value.to_string(),
            is_edited: true,
            ..self.clone()
        }
    }

    /// Copy with a new background color, marked as edited.
    #[must_use]
    pub fn copy_with_background(&self, bgc: &str) -> Self {
        Self {
            bgc: Some(bgc.to_string()),
            is_edited: true,
            ..self.clone()
        }
    }

    /// Content equality ignoring the edited flag.
    pub fn is_content_equal(&self, other: &Cell) -> bool {
        self.colspan == other.colspan
            && self.cell_type == other.cell_type
            && self.merge_id == other.merge_id
            && self.rowspan == other.rowspan
            && self.merged == other.merged
            && self.is_main_cell == other.is_main_cell
            && self.original_row == other.original_row
            && self.value == other.value
            && self.option == other.option
            && self.bgc == other.bgc
    }

    /// Equality used by the diff engine.
    pub fn is_render_equal(&self, other: &Cell) -> bool {
        self.value == other.value
            && self.bgc == other.bgc
            && self.cell_type == other.cell_type
            && self.merged == other.merged
            && self.is_main_cell == other.is_main_cell
            && self.option == other.option
            && self.is_edited == other.is_edited
            && self.colspan == other.colspan
            && self.rowspan == other.rowspan
    }

    /// Merged but not the representative cell of its merge.
    pub fn is_merged_child(&self) -> bool {
        self.merged && !self.is_main_cell
    }

    /// The text drawn for textual cells.
    pub fn display_text(&self) -> &str {
        match self.cell_type {
            CellType::Option => self.option.first().map_or(self.value.as_str(), String::as_str),
            _ => self.value.as_str(),
        }
    }

    /// Background color from the payload when it should override the palette.
    pub fn explicit_background(&self) -> Option<&str> {
        self.bgc
            .as_deref()
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("white"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn cell_type_roundtrips_code() {
        for code in 1..=9 {
            assert_eq!(CellType::from(code).code(), code);
        }
        assert_eq!(CellType::from(42), CellType::Text);
    }

    #[test]
    fn options_accept_mixed_json() {
        let cell: Cell =
            serde_json::from_str(r#"{"cellType":3,"value":"","option":["OK",2,true]}"#).unwrap();
        assert_eq!(cell.option, vec!["OK", "2", "true"]);
        assert_eq!(cell.cell_type, CellType::Option);
        assert_eq!(cell.colspan, 1);
        assert!(!cell.is_edited);
    }

    #[test]
    fn copy_with_edit_marks_edited() {
        let cell = Cell::text("A");
        let edited = cell.copy_with_edit("B");
        assert_eq!(edited.value, "B");
        assert!(edited.is_edited);
        assert!(!cell.is_edited);
    }

    #[test]
    fn display_text_prefers_first_option() {
        let mut cell = Cell::with_type(CellType::Option, "raw");
        assert_eq!(cell.display_text(), "raw");
        cell.option = vec!["first".into(), "second".into()];
        assert_eq!(cell.display_text(), "first");
    }

    #[test]
    fn white_background_is_not_explicit() {
        let mut cell = Cell::text("");
        cell.bgc = Some("white".into());
        assert_eq!(cell.explicit_background(), None);
        cell.bgc = Some(String::new());
        assert_eq!(cell.explicit_background(), None);
        cell.bgc = Some("#FFEBEE".into());
        assert_eq!(cell.explicit_background(), Some("#FFEBEE"));
    }
}
