//! Google Calendar.
//!
//! [`CalendarClient::list_events`] turns raw `events.list` records into a flat
//! list of concrete [`Event`]s:
//!
//! 1. naive window bounds get the client's zone attached,
//! 2. cancelled records are dropped,
//! 3. the rest are decoded (whole dates become midnight in the calendar's zone),
//! 4. recurring masters are replaced by their `instances` inside the window,
//!    looked up concurrently with bounded parallelism.

mod client;
mod model;

pub use client::{CalendarClient, DEFAULT_PARALLELISM, ExpansionErrorPolicy};
pub use model::{Calendar, Event, EventDecodeError, UNTITLED_EVENT, is_cancelled};
