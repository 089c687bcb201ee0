//! Calendar commands.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use gworkspace_api::calendar::{Calendar, CalendarClient, Event};
use gworkspace_api::transport::Transport;
use gworkspace_core::time::TimeWindow;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::config::CalendarSettings;
use crate::error::{CliError, CliResult};

pub async fn calendars(
    transport: Arc<dyn Transport>,
    settings: &CalendarSettings,
    json: bool,
) -> CliResult<()> {
    let client = settings.apply(CalendarClient::new(transport))?;
    let calendars = client.list_calendars().await?;
    if json {
        let values: Vec<_> = calendars
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "name": c.name,
                    "time_zone": c.time_zone.name(),
                    "access_role": c.access_role,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
    } else {
        print!("{}", render_calendars(&calendars));
    }
    Ok(())
}

/// Lists the events of the next `days` days, starting at local midnight today.
pub async fn events(
    transport: Arc<dyn Transport>,
    settings: &CalendarSettings,
    calendar_ids: Vec<String>,
    days: u32,
    expand: bool,
    json: bool,
) -> CliResult<()> {
    if days == 0 {
        return Err(CliError::Usage("--days must be at least 1".to_string()));
    }
    let client = settings.apply(CalendarClient::new(transport))?;
    let tz = client.time_zone();
    let ids = if calendar_ids.is_empty() {
        settings.calendar_ids.clone()
    } else {
        calendar_ids
    };

    let known = client.list_calendars().await?;
    let selected = select_calendars(&known, &ids, tz);

    let today = Utc::now().with_timezone(&tz).date_naive();
    let window = TimeWindow::days_from(today, days, &tz);
    let mut events = client
        .list_events(&selected, window.start, window.end, expand)
        .await?;
    events.sort_by_key(|event| event.start);

    if json {
        println!("{}", events_json(&events)?);
    } else {
        print!("{}", render_events(&events));
    }
    Ok(())
}

/// Picks `ids` from the user's calendar list.
///
/// Ids missing from the list (such as `primary`) are still queried, using
/// `tz` as their zone.
pub fn select_calendars(known: &[Calendar], ids: &[String], tz: Tz) -> Vec<Arc<Calendar>> {
    ids.iter()
        .map(|id| match known.iter().find(|c| c.id == *id) {
            Some(calendar) => Arc::new(calendar.clone()),
            None => {
                debug!(calendar = %id, "not in calendar list, using display zone");
                Arc::new(Calendar::with_id(id.clone(), tz))
            }
        })
        .collect()
}

pub fn render_calendars(calendars: &[Calendar]) -> String {
    calendars
        .iter()
        .map(|c| format!("{}  {}  ({})\n", c.id, c.name, c.time_zone.name()))
        .collect()
}

pub fn render_events(events: &[Event]) -> String {
    if events.is_empty() {
        return "No events\n".to_string();
    }
    events
        .iter()
        .map(|event| {
            let (day, time) = if event.all_day() {
                // Whole dates are rendered in the calendar's own zone.
                (event.start.format("%a %Y-%m-%d").to_string(), "all day".to_string())
            } else {
                let start = event.local_start();
                let end = event.local_end();
                (
                    start.format("%a %Y-%m-%d").to_string(),
                    format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")),
                )
            };
            format!("{}  {:<11}  {}  [{}]\n", day, time, event.name, event.calendar.name)
        })
        .collect()
}

#[derive(Serialize)]
struct EventView<'a> {
    id: &'a str,
    title: &'a str,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    all_day: bool,
    calendar: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    recurrence: Option<&'a [String]>,
}

pub fn events_json(events: &[Event]) -> serde_json::Result<String> {
    let views: Vec<_> = events
        .iter()
        .map(|event| EventView {
            id: &event.id,
            title: &event.name,
            start: event.start,
            end: event.end,
            all_day: event.all_day(),
            calendar: &event.calendar.id,
            recurrence: event.recurrence.as_deref(),
        })
        .collect();
    serde_json::to_string_pretty(&views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn paris() -> Tz {
        "Europe/Paris".parse().unwrap()
    }

    fn work() -> Arc<Calendar> {
        let mut calendar = Calendar::with_id("work@example.com", paris());
        calendar.name = "Work".into();
        Arc::new(calendar)
    }

    fn event(name: &str, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Event {
        Event {
            id: name.to_lowercase(),
            name: name.into(),
            start,
            end,
            calendar: work(),
            tz: paris(),
            recurrence: None,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        paris()
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(y, m, d)
                    .unwrap()
                    .and_hms_opt(h, min, 0)
                    .unwrap(),
            )
            .single()
            .unwrap()
            .fixed_offset()
    }

    #[test]
    fn renders_timed_and_all_day_events() {
        let events = vec![
            event("Holiday", at(2024, 5, 1, 0, 0), at(2024, 5, 2, 0, 0)),
            event("Standup", at(2024, 5, 2, 9, 0), at(2024, 5, 2, 9, 15)),
        ];
        insta::assert_snapshot!(render_events(&events).trim_end(), @r"
        Wed 2024-05-01  all day      Holiday  [Work]
        Thu 2024-05-02  09:00-09:15  Standup  [Work]
        ");
    }

    #[test]
    fn renders_empty_list() {
        assert_eq!(render_events(&[]), "No events\n");
    }

    #[test]
    fn json_output() {
        let mut standup = event("Standup", at(2024, 5, 2, 9, 0), at(2024, 5, 2, 9, 15));
        standup.recurrence = Some(vec!["RRULE:FREQ=DAILY".into()]);
        let json: serde_json::Value = serde_json::from_str(&events_json(&[standup]).unwrap()).unwrap();
        assert_eq!(json[0]["start"], "2024-05-02T09:00:00+02:00");
        assert_eq!(json[0]["all_day"], false);
        assert_eq!(json[0]["calendar"], "work@example.com");
        assert_eq!(json[0]["recurrence"][0], "RRULE:FREQ=DAILY");
    }

    #[test]
    fn unknown_ids_fall_back_to_display_zone() {
        let known = vec![(*work()).clone()];
        let ids = vec!["work@example.com".to_string(), "primary".to_string()];
        let selected = select_calendars(&known, &ids, chrono_tz::UTC);
        assert_eq!(selected[0].name, "Work");
        assert_eq!(selected[0].time_zone, paris());
        assert_eq!(selected[1].id, "primary");
        assert_eq!(selected[1].time_zone, chrono_tz::UTC);
    }

    #[test]
    fn calendar_listing() {
        let calendars = vec![(*work()).clone()];
        insta::assert_snapshot!(render_calendars(&calendars).trim_end(), @"work@example.com  Work  (Europe/Paris)");
    }
}
