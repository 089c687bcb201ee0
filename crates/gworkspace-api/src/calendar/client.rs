//! Calendar API client: calendar listing and event listing with recurrence expansion.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use chrono_tz::Tz;
use futures_util::{StreamExt, TryStreamExt, stream};
use gworkspace_core::time::{TimeWindow, WindowBound, parse_zone};
use serde_json::Value;
use tracing::{debug, warn};

use super::model::{Calendar, Event, is_cancelled};
use crate::error::{ApiError, ApiResult};
use crate::transport::{Request, Service, Transport, drain_pages, segment};

/// Default number of concurrent instance lookups during expansion.
pub const DEFAULT_PARALLELISM: usize = 4;

/// What to do when the instance lookup for one recurring event fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpansionErrorPolicy {
    /// Log the failure and leave that series out of the result.
    #[default]
    SkipEvent,
    /// Fail the whole listing.
    Fail,
}

impl FromStr for ExpansionErrorPolicy {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "skip" | "skip-event" => Ok(Self::SkipEvent),
            "fail" => Ok(Self::Fail),
            other => Err(ApiError::validation(format!(
                "unknown expansion error policy {:?} (expected skip-event or fail)",
                other
            ))),
        }
    }
}

/// Client for the Calendar API.
pub struct CalendarClient {
    transport: Arc<dyn Transport>,
    tz: Tz,
    parallelism: usize,
    policy: ExpansionErrorPolicy,
}

impl CalendarClient {
    /// Creates a client that treats naive window bounds as UTC.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            tz: Tz::UTC,
            parallelism: DEFAULT_PARALLELISM,
            policy: ExpansionErrorPolicy::default(),
        }
    }

    /// Sets the zone attached to naive window bounds and used for display.
    pub fn with_time_zone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    /// Like [`with_time_zone`](Self::with_time_zone) but takes an IANA name.
    pub fn with_time_zone_name(self, name: &str) -> ApiResult<Self> {
        let tz = parse_zone(name)
            .map_err(|e| ApiError::configuration(e.to_string()).with_source(e))?;
        Ok(self.with_time_zone(tz))
    }

    /// Bounds concurrent instance lookups. Zero is treated as one.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_expansion_policy(mut self, policy: ExpansionErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Lists the user's calendar list entries as raw JSON.
    pub async fn list_calendar_entries(&self) -> ApiResult<Vec<Value>> {
        let request = Request::new(Service::Calendar, "users/me/calendarList");
        drain_pages(self.transport.as_ref(), &request).await
    }

    /// Lists the user's calendars.
    pub async fn list_calendars(&self) -> ApiResult<Vec<Calendar>> {
        self.list_calendar_entries()
            .await?
            .into_iter()
            .map(Calendar::from_entry)
            .collect()
    }

    /// Lists the events of `calendars` overlapping `[start, end]`.
    ///
    /// Naive bounds get the client's zone attached. Cancelled records are
    /// dropped. With `expand_recurring`, each recurring master is replaced by
    /// its instances inside the window; otherwise masters are returned as-is.
    /// An event seen twice for the same calendar is kept once, at its first
    /// position.
    pub async fn list_events(
        &self,
        calendars: &[Arc<Calendar>],
        start: impl Into<WindowBound>,
        end: impl Into<WindowBound>,
        expand_recurring: bool,
    ) -> ApiResult<Vec<Event>> {
        let window = TimeWindow::normalized(start, end, &self.tz);

        let mut events = Vec::new();
        for calendar in calendars {
            let request = window_request(
                format!("calendars/{}/events", segment(&calendar.id)),
                &window,
            );
            let records = drain_pages(self.transport.as_ref(), &request).await?;
            events.extend(self.decode_events(records, calendar));
        }

        let events = if expand_recurring {
            self.expand_recurring(events, &window).await?
        } else {
            events
        };
        Ok(dedup_events(events))
    }

    /// Lists the instances of the recurring event `parent` inside `[start, end]`.
    pub async fn list_event_instances(
        &self,
        parent: &Event,
        start: impl Into<WindowBound>,
        end: impl Into<WindowBound>,
    ) -> ApiResult<Vec<Event>> {
        let window = TimeWindow::normalized(start, end, &self.tz);
        self.instances_in(parent, &window).await
    }

    async fn instances_in(&self, parent: &Event, window: &TimeWindow) -> ApiResult<Vec<Event>> {
        let request = window_request(
            format!(
                "calendars/{}/events/{}/instances",
                segment(&parent.calendar.id),
                segment(&parent.id)
            ),
            window,
        );
        let records = drain_pages(self.transport.as_ref(), &request).await?;
        Ok(self.decode_events(records, &parent.calendar))
    }

    /// Replaces recurring masters with their instances, keeping input order.
    async fn expand_recurring(&self, events: Vec<Event>, window: &TimeWindow) -> ApiResult<Vec<Event>> {
        let recurring = events.iter().filter(|e| e.is_recurring()).count();
        if recurring == 0 {
            return Ok(events);
        }
        debug!(recurring, parallelism = self.parallelism, "expanding recurring events");

        let expanded: Vec<Vec<Event>> = stream::iter(events)
            .map(|event| async move {
                if !event.is_recurring() {
                    return Ok(vec![event]);
                }
                match self.instances_in(&event, window).await {
                    Ok(instances) => Ok(instances),
                    Err(e) if self.policy == ExpansionErrorPolicy::SkipEvent => {
                        warn!(
                            calendar = %event.calendar.id,
                            event = %event.id,
                            "skipping recurring event, instance lookup failed: {}",
                            e
                        );
                        Ok(Vec::new())
                    }
                    Err(e) => Err(e),
                }
            })
            .buffered(self.parallelism)
            .try_collect()
            .await?;

        Ok(expanded.into_iter().flatten().collect())
    }

    /// Drops cancelled records and decodes the rest, skipping malformed ones.
    fn decode_events(&self, records: Vec<Value>, calendar: &Arc<Calendar>) -> Vec<Event> {
        let total = records.len();
        let events: Vec<Event> = records
            .into_iter()
            .filter(|record| !is_cancelled(record))
            .filter_map(|record| match Event::from_record(record, calendar, self.tz) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(calendar = %calendar.id, "skipping event: {}", e);
                    None
                }
            })
            .collect();
        debug!(calendar = %calendar.id, total, kept = events.len(), "decoded events");
        events
    }
}

/// Keeps the first event per `(calendar, id)`.
///
/// Modified occurrences of a series come back both from `events` and from the
/// series' `instances`.
fn dedup_events(events: Vec<Event>) -> Vec<Event> {
    let total = events.len();
    let mut seen = HashSet::with_capacity(total);
    let events: Vec<Event> = events
        .into_iter()
        .filter(|event| seen.insert((event.calendar.id.clone(), event.id.clone())))
        .collect();
    if events.len() < total {
        debug!(dropped = total - events.len(), "dropped duplicate events");
    }
    events
}

fn window_request(path: String, window: &TimeWindow) -> Request {
    window
        .query_params()
        .into_iter()
        .fold(Request::new(Service::Calendar, path), |request, (key, value)| {
            request.query(key, value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::FakeTransport;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;

    const EVENTS: &str = "calendars/team%40example.com/events";

    fn setup() -> (Arc<FakeTransport>, CalendarClient, Arc<Calendar>) {
        let fake = Arc::new(FakeTransport::new());
        let client = CalendarClient::new(fake.clone());
        let calendar = Arc::new(Calendar::with_id("team@example.com", Tz::UTC));
        (fake, client, calendar)
    }

    fn timed(id: &str, day: u32) -> Value {
        json!({
            "id": id,
            "summary": id,
            "start": {"dateTime": format!("2024-03-{day:02}T10:00:00Z")},
            "end": {"dateTime": format!("2024-03-{day:02}T11:00:00Z")},
        })
    }

    fn recurring(id: &str) -> Value {
        let mut record = timed(id, 1);
        record["recurrence"] = json!(["RRULE:FREQ=WEEKLY"]);
        record
    }

    fn window() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
        )
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[tokio::test]
    async fn cancelled_records_are_dropped() {
        let (fake, client, calendar) = setup();
        let mut cancelled = timed("gone", 4);
        cancelled["status"] = json!("cancelled");
        fake.push_page(
            Service::Calendar,
            EVENTS,
            json!({"items": [cancelled, timed("kept", 5)]}),
        );

        let (start, end) = window();
        let events = client
            .list_events(&[calendar], start, end, true)
            .await
            .unwrap();
        assert_eq!(ids(&events), ["kept"]);
    }

    #[tokio::test]
    async fn cancelled_record_without_times_is_not_a_decode_failure() {
        let (fake, client, calendar) = setup();
        fake.push_page(
            Service::Calendar,
            EVENTS,
            json!({"items": [{"id": "x", "status": "cancelled"}, {"id": "broken"}, timed("ok", 2)]}),
        );
        let (start, end) = window();
        let events = client
            .list_events(&[calendar], start, end, false)
            .await
            .unwrap();
        assert_eq!(ids(&events), ["ok"]);
    }

    #[tokio::test]
    async fn naive_window_gets_client_zone() {
        let fake = Arc::new(FakeTransport::new());
        let client = CalendarClient::new(fake.clone())
            .with_time_zone_name("America/New_York")
            .unwrap();
        let calendar = Arc::new(Calendar::with_id("team@example.com", Tz::UTC));
        fake.push_page(Service::Calendar, EVENTS, json!({"items": []}));

        let start = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap();
        client
            .list_events(&[calendar], start, end, true)
            .await
            .unwrap();

        let call = &fake.calls_to(EVENTS)[0];
        assert_eq!(call.request.param("timeMin"), Some("2024-03-15T09:30:00-04:00"));
        assert_eq!(call.request.param("timeMax"), Some("2024-03-16T00:00:00+00:00"));
    }

    #[tokio::test]
    async fn recurring_event_expands_to_its_instances() {
        let (fake, client, calendar) = setup();
        fake.push_page(
            Service::Calendar,
            EVENTS,
            json!({"items": [timed("single", 2), recurring("weekly")]}),
        );
        fake.push_page(
            Service::Calendar,
            &format!("{EVENTS}/weekly/instances"),
            json!({"items": [timed("weekly_0308", 8), timed("weekly_0315", 15)]}),
        );

        let (start, end) = window();
        let events = client
            .list_events(&[calendar.clone()], start, end, true)
            .await
            .unwrap();

        assert_eq!(ids(&events), ["single", "weekly_0308", "weekly_0315"]);
        assert!(events.iter().all(|e| Arc::ptr_eq(&e.calendar, &calendar)));

        let instances_call = &fake.calls_to(&format!("{EVENTS}/weekly/instances"))[0];
        assert_eq!(
            instances_call.request.param("timeMin"),
            Some("2024-03-01T00:00:00+00:00")
        );
    }

    #[tokio::test]
    async fn modified_occurrence_is_not_listed_twice() {
        let (fake, client, calendar) = setup();
        let mut moved = timed("weekly_20240308T100000Z", 8);
        moved["recurringEventId"] = json!("weekly");
        fake.push_page(
            Service::Calendar,
            EVENTS,
            json!({"items": [recurring("weekly"), moved]}),
        );
        fake.push_page(
            Service::Calendar,
            &format!("{EVENTS}/weekly/instances"),
            json!({"items": [
                timed("weekly_20240308T100000Z", 8),
                timed("weekly_20240315T100000Z", 15),
            ]}),
        );

        let (start, end) = window();
        let events = client
            .list_events(&[calendar], start, end, true)
            .await
            .unwrap();

        assert_eq!(
            ids(&events),
            ["weekly_20240308T100000Z", "weekly_20240315T100000Z"]
        );
    }

    #[tokio::test]
    async fn repeated_calendar_lists_each_event_once() {
        let (fake, client, calendar) = setup();
        for _ in 0..2 {
            fake.push_page(
                Service::Calendar,
                EVENTS,
                json!({"items": [timed("standup", 4)]}),
            );
        }

        let (start, end) = window();
        let events = client
            .list_events(&[calendar.clone(), calendar], start, end, false)
            .await
            .unwrap();

        assert_eq!(ids(&events), ["standup"]);
        assert_eq!(fake.calls_to(EVENTS).len(), 2);
    }

    #[tokio::test]
    async fn recurring_event_without_instances_contributes_nothing() {
        let (fake, client, calendar) = setup();
        fake.push_page(
            Service::Calendar,
            EVENTS,
            json!({"items": [recurring("ended"), timed("single", 3)]}),
        );
        fake.push_page(
            Service::Calendar,
            &format!("{EVENTS}/ended/instances"),
            json!({"items": []}),
        );

        let (start, end) = window();
        let events = client
            .list_events(&[calendar], start, end, true)
            .await
            .unwrap();
        assert_eq!(ids(&events), ["single"]);
    }

    #[tokio::test]
    async fn no_expansion_keeps_masters() {
        let (fake, client, calendar) = setup();
        fake.push_page(Service::Calendar, EVENTS, json!({"items": [recurring("weekly")]}));

        let (start, end) = window();
        let events = client
            .list_events(&[calendar], start, end, false)
            .await
            .unwrap();
        assert_eq!(ids(&events), ["weekly"]);
        assert!(events[0].is_recurring());
        assert_eq!(fake.calls().len(), 1);
    }

    #[tokio::test]
    async fn instance_failures_skip_the_series_by_default() {
        let (fake, client, calendar) = setup();
        fake.push_page(
            Service::Calendar,
            EVENTS,
            json!({"items": [recurring("broken"), recurring("fine")]}),
        );
        fake.push_error(
            Service::Calendar,
            &format!("{EVENTS}/broken/instances"),
            ApiError::server("backend error"),
        );
        fake.push_page(
            Service::Calendar,
            &format!("{EVENTS}/fine/instances"),
            json!({"items": [timed("fine_1", 9)]}),
        );

        let (start, end) = window();
        let events = client
            .list_events(&[calendar], start, end, true)
            .await
            .unwrap();
        assert_eq!(ids(&events), ["fine_1"]);
    }

    #[tokio::test]
    async fn fail_policy_propagates_instance_errors() {
        let (fake, client, calendar) = setup();
        let client = client.with_expansion_policy(ExpansionErrorPolicy::Fail);
        fake.push_page(Service::Calendar, EVENTS, json!({"items": [recurring("broken")]}));
        fake.push_error(
            Service::Calendar,
            &format!("{EVENTS}/broken/instances"),
            ApiError::rate_limited("slow down"),
        );

        let (start, end) = window();
        let err = client
            .list_events(&[calendar], start, end, true)
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn expansion_order_is_stable_under_parallelism() {
        let (fake, client, calendar) = setup();
        let client = client.with_parallelism(3);
        let masters: Vec<Value> = (0..6).map(|i| recurring(&format!("r{i}"))).collect();
        fake.push_page(Service::Calendar, EVENTS, json!({"items": masters}));
        for i in 0..6 {
            fake.push_page(
                Service::Calendar,
                &format!("{EVENTS}/r{i}/instances"),
                json!({"items": [timed(&format!("r{i}_a"), 10), timed(&format!("r{i}_b"), 17)]}),
            );
        }

        let (start, end) = window();
        let events = client
            .list_events(&[calendar], start, end, true)
            .await
            .unwrap();
        let expected: Vec<String> = (0..6)
            .flat_map(|i| [format!("r{i}_a"), format!("r{i}_b")])
            .collect();
        assert_eq!(ids(&events), expected);
    }

    #[tokio::test]
    async fn events_are_collected_across_calendars_and_pages() {
        let (fake, client, calendar) = setup();
        let other = Arc::new(Calendar::with_id("primary", Tz::UTC));
        fake.push_page(
            Service::Calendar,
            EVENTS,
            json!({"items": [timed("a", 2)], "nextPageToken": "more"}),
        );
        fake.push_page(Service::Calendar, EVENTS, json!({"items": [timed("b", 3)]}));
        fake.push_page(
            Service::Calendar,
            "calendars/primary/events",
            json!({"items": [timed("c", 4)]}),
        );

        let (start, end) = window();
        let events = client
            .list_events(&[calendar, other.clone()], start, end, true)
            .await
            .unwrap();
        assert_eq!(ids(&events), ["a", "b", "c"]);
        assert!(Arc::ptr_eq(&events[2].calendar, &other));
    }

    #[tokio::test]
    async fn list_event_instances_directly() {
        let (fake, client, calendar) = setup();
        let parent = Event::from_record(recurring("weekly"), &calendar, Tz::UTC).unwrap();
        fake.push_page(
            Service::Calendar,
            &format!("{EVENTS}/weekly/instances"),
            json!({"items": [timed("w1", 8), {"id": "w2", "status": "cancelled"}]}),
        );

        let (start, end) = window();
        let instances = client
            .list_event_instances(&parent, start, end)
            .await
            .unwrap();
        assert_eq!(ids(&instances), ["w1"]);
    }

    #[tokio::test]
    async fn calendars_are_listed_and_decoded() {
        let (fake, client, _) = setup();
        fake.push_page(
            Service::Calendar,
            "users/me/calendarList",
            json!({"items": [
                {"id": "primary@example.com", "summary": "Me", "timeZone": "Europe/Paris"},
                {"id": "h@group", "summary": "Holidays", "summaryOverride": "Days off", "timeZone": "UTC"},
            ]}),
        );

        let calendars = client.list_calendars().await.unwrap();
        let names: Vec<_> = calendars.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Me", "Days off"]);
    }

    #[test]
    fn builder_defaults() {
        let fake = Arc::new(FakeTransport::new());
        let client = CalendarClient::new(fake).with_parallelism(0);
        assert_eq!(client.parallelism(), 1);
        assert_eq!(client.time_zone(), Tz::UTC);
        assert!(
            CalendarClient::new(Arc::new(FakeTransport::new()))
                .with_time_zone_name("Nowhere/Special")
                .is_err()
        );
    }

    #[test]
    fn policy_parsing() {
        assert_eq!(
            "skip_event".parse::<ExpansionErrorPolicy>().unwrap(),
            ExpansionErrorPolicy::SkipEvent
        );
        assert_eq!(
            "FAIL".parse::<ExpansionErrorPolicy>().unwrap(),
            ExpansionErrorPolicy::Fail
        );
        assert!("retry".parse::<ExpansionErrorPolicy>().is_err());
    }
}
