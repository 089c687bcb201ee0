//! Sheets API client.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::model::{Sheet, SheetProperties, Spreadsheet, cell_text};
use crate::error::{ApiError, ApiResult};
use crate::transport::{Request, Service, Transport, decode, segment};

/// How written values are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueInputOption {
    /// Stored exactly as given.
    #[default]
    Raw,
    /// Parsed as if typed into the UI (formulas, numbers, dates).
    UserEntered,
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::UserEntered => "USER_ENTERED",
        }
    }
}

impl fmt::Display for ValueInputOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    values: Option<Vec<Vec<Value>>>,
}

/// Client for the Sheets API.
pub struct SheetsClient {
    transport: Arc<dyn Transport>,
}

impl SheetsClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Loads a spreadsheet's metadata and the values of every sheet.
    ///
    /// Values are fetched with a single `values:batchGet` covering each
    /// sheet's full grid.
    pub async fn open(&self, spreadsheet_id: &str) -> ApiResult<Spreadsheet> {
        let id = segment(spreadsheet_id);
        let response = self
            .transport
            .get(&Request::new(Service::Sheets, format!("spreadsheets/{}", id)))
            .await?;
        let response: SpreadsheetResponse = decode(response, "spreadsheet")?;

        let mut sheets: Vec<Sheet> = response
            .sheets
            .into_iter()
            .map(|entry| Sheet::from(entry.properties))
            .collect();

        if !sheets.is_empty() {
            let request = sheets.iter().fold(
                Request::new(Service::Sheets, format!("spreadsheets/{}/values:batchGet", id)),
                |request, sheet| request.query("ranges", sheet.encompassing_range()),
            );
            let values: BatchGetResponse = decode(self.transport.get(&request).await?, "value ranges")?;

            for (sheet, range) in sheets.iter_mut().zip(values.value_ranges) {
                // Empty sheets come back without `values`.
                if let Some(rows) = range.values {
                    sheet.set_values(
                        rows.iter()
                            .map(|row| row.iter().map(cell_text).collect())
                            .collect(),
                    );
                }
            }
        }

        debug!(spreadsheet = spreadsheet_id, sheets = sheets.len(), "opened spreadsheet");
        Ok(Spreadsheet {
            id: spreadsheet_id.to_string(),
            title: response.properties.title,
            sheets,
        })
    }

    /// Writes a block of values to `range`.
    ///
    /// Returns the number of updated cells.
    pub async fn update_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        option: ValueInputOption,
    ) -> ApiResult<u64> {
        self.batch_update_values(
            spreadsheet_id,
            vec![json!({"range": range, "values": values})],
            option,
        )
        .await
    }

    /// Writes one value per cell; `cells[i]` receives `values[i]`.
    pub async fn update_single_cells(
        &self,
        spreadsheet_id: &str,
        cells: &[&str],
        values: &[String],
        option: ValueInputOption,
    ) -> ApiResult<u64> {
        if cells.len() != values.len() {
            return Err(ApiError::validation(format!(
                "{} cells but {} values",
                cells.len(),
                values.len()
            )));
        }
        let data = cells
            .iter()
            .zip(values)
            .map(|(cell, value)| json!({"range": cell, "values": [[value]]}))
            .collect();
        self.batch_update_values(spreadsheet_id, data, option).await
    }

    async fn batch_update_values(
        &self,
        spreadsheet_id: &str,
        data: Vec<Value>,
        option: ValueInputOption,
    ) -> ApiResult<u64> {
        let request = Request::new(
            Service::Sheets,
            format!("spreadsheets/{}/values:batchUpdate", segment(spreadsheet_id)),
        );
        let body = json!({"data": data, "valueInputOption": option.as_str()});
        let response = self.transport.create(&request, body).await?;
        Ok(response
            .get("totalUpdatedCells")
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    /// Adds a new sheet titled `name` and returns it.
    pub async fn add_sheet(&self, spreadsheet_id: &str, name: &str) -> ApiResult<Sheet> {
        let request = Request::new(
            Service::Sheets,
            format!("spreadsheets/{}:batchUpdate", segment(spreadsheet_id)),
        );
        let body = json!({"requests": [{"addSheet": {"properties": {"title": name}}}]});
        let mut response = self.transport.create(&request, body).await?;

        let properties = response
            .pointer_mut("/replies/0/addSheet/properties")
            .map(Value::take)
            .ok_or_else(|| ApiError::invalid_response("addSheet reply missing properties"))?;
        let properties: SheetProperties = decode(properties, "sheet properties")?;
        Ok(Sheet::from(properties))
    }
}
