//! Core types: A1 coordinates, time-zone normalization, tracing

pub mod a1;
pub mod time;
pub mod tracing;

pub use a1::{
    CellAddress, InvalidAddress, address_to_coordinates, column_name_to_number,
    column_number_to_name, generate_blank_values, sheet_range,
};
pub use time::{
    TimeWindow, UnknownTimeZone, WindowBound, localize, normalize_timestamp, parse_zone,
    start_of_day,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
