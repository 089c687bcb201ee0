//! A1-notation cell addressing.
//!
//! Spreadsheet columns are named with bijective base-26 numerals: there is no
//! zero digit, so column 26 is `Z` and column 27 is `AA` (not `BA`). Rows are
//! plain 1-based integers. A cell address is the column name followed by the
//! row number, e.g. `C12`.
//!
//! All parsing here is total: malformed input yields `None`, never a panic.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([a-z]+)([0-9]+)$").expect("valid address regex"));

/// Converts a 1-based column number to its column name.
///
/// `1 -> "A"`, `26 -> "Z"`, `27 -> "AA"`, `703 -> "AAA"`. Column numbers
/// start at 1, so `0` has no name and yields an empty string.
pub fn column_number_to_name(n: u32) -> String {
    let mut letters = Vec::new();
    let mut n = n;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Converts a column name to its 1-based column number, ignoring case.
///
/// Returns `None` for an empty name, a name containing anything other than
/// ASCII letters, or a name too long to fit in a `u32`.
pub fn column_name_to_number(name: &str) -> Option<u32> {
    if name.is_empty() {
        return None;
    }
    name.bytes().try_fold(0u32, |acc, b| {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// Parses an A1 address into `(row, column)`, both 1-based.
///
/// `"B7" -> Some((7, 2))`. Anything that is not letters followed by digits
/// (`"7B"`, `"B"`, `"B7x"`, `"B0"`) yields `None`.
pub fn address_to_coordinates(address: &str) -> Option<(u32, u32)> {
    address
        .parse::<CellAddress>()
        .ok()
        .map(|cell| (cell.row, cell.column))
}

/// Builds a `rows` x `columns` grid of empty strings, row-major.
pub fn generate_blank_values(rows: usize, columns: usize) -> Vec<Vec<String>> {
    vec![vec![String::new(); columns]; rows]
}

/// A parsed cell address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// 1-based row number.
    pub row: u32,
    /// 1-based column number.
    pub column: u32,
}

impl CellAddress {
    /// Creates a cell address from 1-based coordinates.
    ///
    /// Returns `None` if either coordinate is zero.
    pub fn new(row: u32, column: u32) -> Option<Self> {
        (row > 0 && column > 0).then_some(Self { row, column })
    }

    /// Returns the column name (e.g. `"AB"`).
    pub fn column_name(&self) -> String {
        column_number_to_name(self.column)
    }
}

/// Error returned when a string is not a valid A1 address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cell address: {0:?}")]
pub struct InvalidAddress(pub String);

impl FromStr for CellAddress {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidAddress(s.to_string());
        let caps = ADDRESS_RE.captures(s).ok_or_else(invalid)?;
        let column = column_name_to_number(&caps[1]).ok_or_else(invalid)?;
        let row: u32 = caps[2].parse().map_err(|_| invalid())?;
        Self::new(row, column).ok_or_else(invalid)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_name(), self.row)
    }
}

/// Formats the range covering `rows` x `columns` cells of a sheet, starting at `A1`.
///
/// The sheet title is quoted when it contains characters other than ASCII
/// alphanumerics and underscores; embedded single quotes are doubled.
pub fn sheet_range(title: &str, rows: u32, columns: u32) -> String {
    let last = CellAddress {
        row: rows.max(1),
        column: columns.max(1),
    };
    format!("{}!A1:{}", quote_sheet_title(title), last)
}

fn quote_sheet_title(title: &str) -> String {
    if !title.is_empty()
        && title
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        title.to_string()
    } else {
        format!("'{}'", title.replace('\'', "''"))
    }
}
