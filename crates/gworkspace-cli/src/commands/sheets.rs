//! Spreadsheet commands.

use std::sync::Arc;

use gworkspace_api::sheets::{Sheet, SheetsClient, Spreadsheet};
use gworkspace_api::transport::Transport;
use gworkspace_core::a1::CellAddress;

use crate::error::{CliError, CliResult};

/// Prints a spreadsheet overview, or one cell with `--cell`.
pub async fn show(
    transport: Arc<dyn Transport>,
    id: &str,
    sheet: Option<&str>,
    cell: Option<&str>,
) -> CliResult<()> {
    let spreadsheet = SheetsClient::new(transport).open(id).await?;

    match cell {
        Some(address) => {
            let sheet = pick_sheet(&spreadsheet, sheet)?;
            println!("{}", cell_value(sheet, address)?);
        }
        None => print!("{}", render_spreadsheet(&spreadsheet)),
    }
    Ok(())
}

/// The sheet named `title`, or the first tab.
pub fn pick_sheet<'a>(spreadsheet: &'a Spreadsheet, title: Option<&str>) -> CliResult<&'a Sheet> {
    match title {
        Some(title) => spreadsheet
            .get_sheet(title)
            .ok_or_else(|| CliError::Usage(format!("no sheet named {:?}", title))),
        None => spreadsheet
            .sheet_at(0)
            .or_else(|| spreadsheet.sheets.first())
            .ok_or_else(|| CliError::Usage("spreadsheet has no sheets".to_string())),
    }
}

/// Reads one cell; cells outside the loaded values are empty.
pub fn cell_value<'a>(sheet: &'a Sheet, address: &str) -> CliResult<&'a str> {
    let address: CellAddress = address
        .parse()
        .map_err(|e: gworkspace_core::a1::InvalidAddress| CliError::Usage(e.to_string()))?;
    Ok(sheet.get(address.row, address.column).unwrap_or(""))
}

pub fn render_spreadsheet(spreadsheet: &Spreadsheet) -> String {
    let mut out = format!("{} ({})\n", spreadsheet.title, spreadsheet.id);
    for sheet in &spreadsheet.sheets {
        out.push_str(&format!(
            "  {}: {}  {}x{}{}\n",
            sheet.index,
            sheet.title,
            sheet.row_count(),
            sheet.col_count(),
            if sheet.hidden { "  (hidden)" } else { "" }
        ));
    }
    out
}
