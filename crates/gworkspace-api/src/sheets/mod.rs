//! Google Sheets.
//!
//! [`SheetsClient::open`] loads a [`Spreadsheet`] with every sheet's values;
//! cells are then addressed with 1-based coordinates or A1 notation.

mod client;
mod model;

pub use client::{SheetsClient, ValueInputOption};
pub use model::{Sheet, Spreadsheet};
