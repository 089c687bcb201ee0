//! Spreadsheet and sheet grids.

use gworkspace_core::a1::{address_to_coordinates, sheet_range};
use serde::Deserialize;
use serde_json::Value;

/// A spreadsheet with the values of all its sheets.
#[derive(Debug, Clone, PartialEq)]
pub struct Spreadsheet {
    pub id: String,
    pub title: String,
    pub sheets: Vec<Sheet>,
}

impl Spreadsheet {
    /// Finds a sheet by title, ignoring case.
    pub fn get_sheet(&self, title: &str) -> Option<&Sheet> {
        let title = title.to_lowercase();
        self.sheets
            .iter()
            .find(|sheet| sheet.title.to_lowercase() == title)
    }

    /// Returns the sheet at `index` in tab order.
    pub fn sheet_at(&self, index: u32) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.index == index)
    }
}

/// One tab of a spreadsheet.
///
/// `meta_row_count`/`meta_col_count` are the grid dimensions reported by the
/// API; `row_count`/`col_count` describe the values actually loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub id: i64,
    pub title: String,
    pub index: u32,
    pub hidden: bool,
    pub sheet_type: String,
    pub meta_row_count: u32,
    pub meta_col_count: u32,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    hidden: bool,
    #[serde(default = "default_sheet_type")]
    sheet_type: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
}

fn default_sheet_type() -> String {
    "GRID".to_string()
}

impl From<SheetProperties> for Sheet {
    fn from(props: SheetProperties) -> Self {
        Self {
            id: props.sheet_id,
            title: props.title,
            index: props.index,
            hidden: props.hidden,
            sheet_type: props.sheet_type,
            meta_row_count: props.grid_properties.row_count,
            meta_col_count: props.grid_properties.column_count,
            values: Vec::new(),
        }
    }
}

/// Renders a cell value the way it is shown in the grid.
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Sheet {
    /// An empty, visible grid sheet.
    pub fn new(id: i64, title: impl Into<String>, index: u32) -> Self {
        Self {
            id,
            title: title.into(),
            index,
            hidden: false,
            sheet_type: default_sheet_type(),
            meta_row_count: 0,
            meta_col_count: 0,
            values: Vec::new(),
        }
    }

    /// Replaces the loaded values.
    pub fn set_values(&mut self, values: Vec<Vec<String>>) {
        self.values = values;
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.values
    }

    /// Number of loaded rows.
    pub fn row_count(&self) -> usize {
        self.values.len()
    }

    /// Width of the widest loaded row.
    pub fn col_count(&self) -> usize {
        self.values.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// The A1 range covering the whole grid, e.g. `Sheet1!A1:Z1000`.
    pub fn encompassing_range(&self) -> String {
        sheet_range(&self.title, self.meta_row_count, self.meta_col_count)
    }

    /// Returns the value at 1-based `(row, col)`, or `None` outside the loaded values.
    pub fn get(&self, row: u32, col: u32) -> Option<&str> {
        let row = usize::try_from(row).ok()?.checked_sub(1)?;
        let col = usize::try_from(col).ok()?.checked_sub(1)?;
        self.values.get(row)?.get(col).map(String::as_str)
    }

    /// Returns the value at an A1 address such as `"B7"`.
    pub fn cell(&self, address: &str) -> Option<&str> {
        let (row, col) = address_to_coordinates(address)?;
        self.get(row, col)
    }
}
