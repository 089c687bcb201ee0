//! Time-zone handling for query windows and event instants.
//!
//! This module provides [`WindowBound`] for query bounds that may or may not
//! carry a zone, [`TimeWindow`] for a normalized `[start, end]` query range,
//! and [`localize`] for attaching an IANA zone to a wall-clock time without
//! shifting it.

use chrono::offset::LocalResult;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when an IANA time-zone name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown time zone: {0}")]
pub struct UnknownTimeZone(pub String);

/// Parses an IANA time-zone name such as `"America/New_York"`.
pub fn parse_zone(name: &str) -> Result<Tz, UnknownTimeZone> {
    name.parse::<Tz>()
        .map_err(|_| UnknownTimeZone(name.to_string()))
}

/// Attaches `tz` to a wall-clock time, keeping the wall-clock reading.
///
/// When the local time is ambiguous (DST fall-back) the earlier instant is
/// used. When it falls in a DST gap, the offset in force at that UTC reading
/// is used, so the wall-clock fields are still preserved.
pub fn localize(naive: NaiveDateTime, tz: &Tz) -> DateTime<FixedOffset> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.fixed_offset(),
        LocalResult::None => {
            let offset = tz.offset_from_utc_datetime(&naive).fix();
            DateTime::from_naive_utc_and_offset(naive - offset, offset)
        }
    }
}

/// Returns local midnight of `date` in `tz`.
pub fn start_of_day(date: NaiveDate, tz: &Tz) -> DateTime<FixedOffset> {
    localize(date.and_time(NaiveTime::MIN), tz)
}

/// A query-window bound, with or without a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowBound {
    /// A wall-clock time with no zone attached.
    Naive(NaiveDateTime),
    /// An instant with a known offset.
    Zoned(DateTime<FixedOffset>),
}

impl WindowBound {
    /// Resolves this bound to an instant.
    ///
    /// Zoned bounds are returned unchanged; naive bounds get `default_tz`
    /// attached without shifting the wall-clock time.
    pub fn normalize(self, default_tz: &Tz) -> DateTime<FixedOffset> {
        match self {
            Self::Zoned(dt) => dt,
            Self::Naive(naive) => localize(naive, default_tz),
        }
    }

    /// Returns `true` if this bound already carries a zone.
    pub fn is_zoned(&self) -> bool {
        matches!(self, Self::Zoned(_))
    }
}

impl From<NaiveDateTime> for WindowBound {
    fn from(naive: NaiveDateTime) -> Self {
        Self::Naive(naive)
    }
}

impl From<NaiveDate> for WindowBound {
    fn from(date: NaiveDate) -> Self {
        Self::Naive(date.and_time(NaiveTime::MIN))
    }
}

impl From<DateTime<FixedOffset>> for WindowBound {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::Zoned(dt)
    }
}

impl From<DateTime<Utc>> for WindowBound {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Zoned(dt.fixed_offset())
    }
}

impl From<DateTime<Tz>> for WindowBound {
    fn from(dt: DateTime<Tz>) -> Self {
        Self::Zoned(dt.fixed_offset())
    }
}

/// Resolves a bound against a default zone. See [`WindowBound::normalize`].
pub fn normalize_timestamp(bound: impl Into<WindowBound>, default_tz: &Tz) -> DateTime<FixedOffset> {
    bound.into().normalize(default_tz)
}

/// A normalized query window.
///
/// Both ends are inclusive as far as this crate is concerned; the remote
/// service decides the exact boundary semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window.
    pub start: DateTime<FixedOffset>,
    /// End of the window.
    pub end: DateTime<FixedOffset>,
}

impl TimeWindow {
    /// Creates a window from two bounds, attaching `default_tz` to naive ones.
    pub fn normalized(
        start: impl Into<WindowBound>,
        end: impl Into<WindowBound>,
        default_tz: &Tz,
    ) -> Self {
        Self {
            start: normalize_timestamp(start, default_tz),
            end: normalize_timestamp(end, default_tz),
        }
    }

    /// Creates a window covering `days` whole days starting at local midnight of `date`.
    pub fn days_from(date: NaiveDate, days: u32, tz: &Tz) -> Self {
        let end_date = date
            .checked_add_days(chrono::Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        Self {
            start: start_of_day(date, tz),
            end: start_of_day(end_date, tz),
        }
    }

    /// Returns `true` if `dt` lies within `[start, end]`.
    pub fn contains<Z: TimeZone>(&self, dt: &DateTime<Z>) -> bool {
        let dt = dt.fixed_offset();
        self.start <= dt && dt <= self.end
    }

    /// Returns the `timeMin`/`timeMax` query parameters for this window.
    pub fn query_params(&self) -> [(&'static str, String); 2] {
        [
            ("timeMin", self.start.to_rfc3339()),
            ("timeMax", self.end.to_rfc3339()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn parse_known_and_unknown_zones() {
        assert_eq!(parse_zone("America/New_York").unwrap(), Tz::America__New_York);
        assert_eq!(parse_zone("UTC").unwrap(), Tz::UTC);
        let err = parse_zone("Mars/Olympus").unwrap_err();
        assert_eq!(err.to_string(), "unknown time zone: Mars/Olympus");
    }

    #[test]
    fn naive_bound_gets_default_zone_without_shift() {
        let ny = parse_zone("America/New_York").unwrap();
        let bound = WindowBound::from(naive(2024, 3, 15, 9, 30));
        assert!(!bound.is_zoned());

        let dt = bound.normalize(&ny);
        assert_eq!(dt.hour(), 9);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.offset().local_minus_utc(), -4 * 3600);
        assert_eq!(dt.to_rfc3339(), "2024-03-15T09:30:00-04:00");
    }

    #[test]
    fn zoned_bound_is_not_reinterpreted() {
        let ny = parse_zone("America/New_York").unwrap();
        let utc_dt = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();
        let dt = normalize_timestamp(utc_dt, &ny);
        assert_eq!(dt, utc_dt.fixed_offset());
        assert_eq!(dt.to_rfc3339(), "2024-03-15T09:30:00+00:00");
    }

    #[test]
    fn naive_bound_defaults_to_utc() {
        let dt = normalize_timestamp(naive(2024, 1, 1, 0, 0), &Tz::UTC);
        assert_eq!(dt.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn localize_ambiguous_picks_earlier() {
        let ny = parse_zone("America/New_York").unwrap();
        // 2024-11-03 01:30 happens twice in New York.
        let dt = localize(naive(2024, 11, 3, 1, 30), &ny);
        assert_eq!(dt.hour(), 1);
        assert_eq!(dt.offset().local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn localize_gap_keeps_wall_clock() {
        let ny = parse_zone("America/New_York").unwrap();
        // 2024-03-10 02:30 does not exist in New York.
        let dt = localize(naive(2024, 3, 10, 2, 30), &ny);
        assert_eq!(dt.day(), 10);
        assert_eq!(dt.hour(), 2);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn window_from_mixed_bounds() {
        let ny = parse_zone("America/New_York").unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap();
        let window = TimeWindow::normalized(naive(2024, 3, 15, 0, 0), end, &ny);
        assert_eq!(window.start.to_rfc3339(), "2024-03-15T00:00:00-04:00");
        assert_eq!(window.end, end.fixed_offset());

        let [(min_key, min), (max_key, max)] = window.query_params();
        assert_eq!((min_key, min.as_str()), ("timeMin", "2024-03-15T00:00:00-04:00"));
        assert_eq!((max_key, max.as_str()), ("timeMax", "2024-03-16T00:00:00+00:00"));
    }

    #[test]
    fn window_days_from() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let ny = parse_zone("America/New_York").unwrap();
        let window = TimeWindow::days_from(date, 2, &ny);
        assert_eq!(window.start.to_rfc3339(), "2024-03-09T00:00:00-05:00");
        assert_eq!(window.end.to_rfc3339(), "2024-03-11T00:00:00-04:00");
        assert!(window.contains(&Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()));
        assert!(!window.contains(&Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap()));
    }

    #[test]
    fn start_of_day_is_midnight() {
        let tokyo = parse_zone("Asia/Tokyo").unwrap();
        let dt = start_of_day(NaiveDate::from_ymd_opt(2025, 2, 5).unwrap(), &tokyo);
        assert_eq!(dt.time(), NaiveTime::MIN);
        assert_eq!(dt.year(), 2025);
        assert_eq!(dt.to_rfc3339(), "2025-02-05T00:00:00+09:00");
    }
}
