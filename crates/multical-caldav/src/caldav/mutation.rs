//! Writing events: body encoding, create with conflict retry, update, delete.

use std::fmt;

use chrono::{DateTime, Offset, TimeZone, Utc};
use multical_core::EventDraft;
use rand::Rng;
use tracing::{debug, info, warn};
use url::Url;

use super::client::{DavClient, join, status_error};
use super::ics::escape_text;
use super::transport::DavMethod;
use super::xml::format_compact_utc;
use crate::account::CreatedEvent;
use crate::error::{CalDavError, CalDavResult};
use crate::normalize::raw_from_draft;
use crate::raw_event::{EventTime, RawEvent};

/// PRODID written into every stored calendar object.
pub const PRODID: &str = "-//CALENDARSERVER.ORG//NONSGML Version 1//EN";

/// Maximum content line length in octets, CRLF excluded.
const MAX_LINE_OCTETS: usize = 75;

/// Encodes `event` as a complete VCALENDAR object.
///
/// Attendees matching `account_email` are left out; when any attendee line
/// is written the account is added as organizer and attendee.
pub fn encode_event(event: &RawEvent, account_email: &str, stamp: DateTime<Utc>) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
    ];

    let mut zones: Vec<&str> = Vec::new();
    for time in [&event.start, &event.end] {
        if let Some(tzid) = time.tzid()
            && !zones.contains(&tzid)
        {
            zones.push(tzid);
        }
    }
    for tzid in zones {
        lines.extend(vtimezone(tzid, event.start.to_utc()));
    }

    lines.push("BEGIN:VEVENT".to_string());
    lines.push(format!("UID:{}", event.uid));
    lines.push(format!("DTSTAMP:{}", format_compact_utc(stamp)));
    lines.push(event.start.to_ics_line("DTSTART"));
    lines.push(event.end.to_ics_line("DTEND"));
    for (name, value) in [
        ("SUMMARY", &event.summary),
        ("LOCATION", &event.location),
        ("DESCRIPTION", &event.description),
    ] {
        if let Some(value) = value {
            lines.push(format!("{name}:{}", escape_text(value)));
        }
    }

    let attendee_lines: Vec<String> = event
        .attendees
        .iter()
        .filter(|a| !a.email.eq_ignore_ascii_case(account_email))
        .map(|a| {
            format!(
                "ATTENDEE;PARTSTAT=NEEDS-ACTION;ROLE=REQ-PARTICIPANT;RSVP=TRUE:mailto:{}",
                a.email
            )
        })
        .collect();
    if !attendee_lines.is_empty() {
        lines.extend(attendee_lines);
        lines.push(format!("ORGANIZER;CN=Organizer:mailto:{account_email}"));
        lines.push(format!("ATTENDEE;CN=Organizer:mailto:{account_email}"));
    }

    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    let mut body = String::new();
    for line in &lines {
        body.push_str(&fold_line(line));
        body.push_str("\r\n");
    }
    body
}

/// Minimal VTIMEZONE carrying the zone's offset at `at`.
///
/// Unknown zones produce nothing; their times are written in UTC anyway.
fn vtimezone(tzid: &str, at: DateTime<Utc>) -> Vec<String> {
    let Some(tz) = EventTime::zone(tzid) else {
        return Vec::new();
    };
    let offset = format_offset(
        tz.offset_from_utc_datetime(&at.naive_utc())
            .fix()
            .local_minus_utc(),
    );
    vec![
        "BEGIN:VTIMEZONE".to_string(),
        format!("TZID:{tzid}"),
        "BEGIN:STANDARD".to_string(),
        "DTSTART:19700101T000000".to_string(),
        format!("TZOFFSETFROM:{offset}"),
        format!("TZOFFSETTO:{offset}"),
        "END:STANDARD".to_string(),
        "END:VTIMEZONE".to_string(),
    ]
}

/// `+HHMM` / `-HHMM`.
fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    format!("{sign}{:02}{:02}", minutes / 60, minutes % 60)
}

/// Folds a content line at 75 octets without splitting characters.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut used = 0;
    // continuation lines lose one octet to the leading space
    let mut limit = MAX_LINE_OCTETS;
    for c in line.chars() {
        if used + c.len_utf8() > limit {
            out.push_str("\r\n ");
            used = 0;
            limit = MAX_LINE_OCTETS - 1;
        }
        out.push(c);
        used += c.len_utf8();
    }
    out
}

/// Generates UIDs for new events.
pub trait UidGenerator: Send + Sync {
    fn generate(&self, start: DateTime<Utc>) -> String;
}

/// `<compact UTC start>-<10 random digits>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomUid;

impl UidGenerator for RandomUid {
    fn generate(&self, start: DateTime<Utc>) -> String {
        let mut rng = rand::rng();
        let suffix: String = (0..10)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        format!("{}-{suffix}", format_compact_utc(start))
    }
}

/// Progress of a create, counted in PUT attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateState {
    /// PUT number `n` is about to be sent.
    Attempting(u32),
    /// PUT number `n` was refused; another UID may be tried.
    Conflict(u32),
    /// PUT number `n` was stored.
    Succeeded(u32),
    /// PUT number `n` was refused and the budget is spent.
    ExhaustedRetries(u32),
    /// PUT number `n` hit a status a new UID cannot fix.
    Failed(u32),
}

impl CreateState {
    pub fn start() -> Self {
        Self::Attempting(1)
    }

    /// Applies the status of the current attempt. Only `201 Created` counts
    /// as stored; 401, 403 and 5xx fail at once.
    pub fn on_status(self, status: u16, max_attempts: u32) -> Self {
        match self {
            Self::Attempting(n) if status == 201 => Self::Succeeded(n),
            Self::Attempting(n) if matches!(status, 401 | 403 | 500..) => Self::Failed(n),
            Self::Attempting(n) if n >= max_attempts => Self::ExhaustedRetries(n),
            Self::Attempting(n) => Self::Conflict(n),
            other => other,
        }
    }

    /// Moves from a conflict to the next attempt.
    pub fn retry(self) -> Self {
        match self {
            Self::Conflict(n) => Self::Attempting(n + 1),
            other => other,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded(_) | Self::ExhaustedRetries(_) | Self::Failed(_)
        )
    }

    pub fn attempts(self) -> u32 {
        match self {
            Self::Attempting(n)
            | Self::Conflict(n)
            | Self::Succeeded(n)
            | Self::ExhaustedRetries(n)
            | Self::Failed(n) => n,
        }
    }
}

impl fmt::Display for CreateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempting(n) => write!(f, "attempting #{n}"),
            Self::Conflict(n) => write!(f, "conflict on #{n}"),
            Self::Succeeded(n) => write!(f, "succeeded on #{n}"),
            Self::ExhaustedRetries(n) => write!(f, "exhausted after {n} attempts"),
            Self::Failed(n) => write!(f, "failed on #{n}"),
        }
    }
}

/// UID for an update: the draft's id, or the href's file stem.
pub fn update_uid(draft: &EventDraft, event_url: &Url) -> CalDavResult<String> {
    if let Some(id) = draft.event_id.as_deref().filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }
    event_url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|name| name.strip_suffix(".ics").unwrap_or(name))
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            CalDavError::invalid_input(format!("cannot derive an event UID from {event_url}"))
        })
}

/// Ensures a collection URL ends with `/` so hrefs join below it.
pub fn collection_url(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Writes events through a [`DavClient`].
pub struct EventWriter<'a> {
    pub dav: &'a DavClient,
    pub account_email: &'a str,
    pub create_attempts: u32,
    pub uids: &'a dyn UidGenerator,
}

impl EventWriter<'_> {
    /// Stores a new event under a fresh UID.
    ///
    /// 409, 412 and other refusals are conflicts, retried under a new UID
    /// until the attempt budget is spent. Authentication, authorization and
    /// server failures end the create immediately, as do transport failures.
    pub async fn create(
        &self,
        calendar_url: &Url,
        calendar_id: &str,
        draft: &EventDraft,
    ) -> CalDavResult<CreatedEvent> {
        let collection = collection_url(calendar_url);
        let mut state = CreateState::start();

        loop {
            let uid = self.uids.generate(draft.start);
            let raw = raw_from_draft(draft, &uid)?;
            let body = encode_event(&raw, self.account_email, Utc::now());
            let url = join(&collection, &format!("{uid}.ics"))?;

            let status = self
                .dav
                .put(&url, body, &[("If-None-Match", "*")])
                .await?;
            state = state.on_status(status, self.create_attempts);

            match state {
                CreateState::Succeeded(n) => {
                    info!(uid = %uid, attempts = n, calendar = %calendar_id, "Created event");
                    return Ok(CreatedEvent {
                        event_id: uid,
                        calendar_id: calendar_id.to_string(),
                        event_url: url.path().to_string(),
                    });
                }
                CreateState::ExhaustedRetries(n) => {
                    warn!(attempts = n, status, calendar = %calendar_id, "Giving up on create");
                    return Err(CalDavError::conflict(format!(
                        "event not created after {n} attempts"
                    ))
                    .with_status(status));
                }
                CreateState::Failed(n) => {
                    warn!(attempt = n, status, calendar = %calendar_id, "Create failed");
                    return Err(status_error(DavMethod::Put, &url, status));
                }
                CreateState::Conflict(n) => {
                    debug!(uid = %uid, attempt = n, status, "Create refused, retrying with new UID");
                    state = state.retry();
                }
                CreateState::Attempting(_) => {}
            }
        }
    }

    /// Overwrites the event at `event_url`; true on 200 or 204.
    pub async fn update(&self, event_url: &Url, draft: &EventDraft) -> CalDavResult<bool> {
        let uid = update_uid(draft, event_url)?;
        let raw = raw_from_draft(draft, &uid)?;
        let body = encode_event(&raw, self.account_email, Utc::now());

        let status = self.dav.put(event_url, body, &[("If-Match", "*")]).await?;
        let updated = matches!(status, 200 | 204);
        if !updated {
            warn!(url = %event_url, status, "Update rejected");
        }
        Ok(updated)
    }

    /// Deletes the event at `event_url`; true only on 204.
    pub async fn delete(&self, event_url: &Url) -> CalDavResult<bool> {
        let status = self.dav.delete(event_url).await?;
        let deleted = status == 204;
        if !deleted {
            warn!(url = %event_url, status, "Delete not confirmed");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caldav::config::ServerFlavor;
    use crate::caldav::ics::parse_calendar_data;
    use crate::caldav::testing::ScriptedTransport;
    use crate::caldav::transport::DavMethod;
    use crate::error::CalDavErrorCode;
    use crate::raw_event::RawAttendee;
    use std::sync::{Arc, Mutex};

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    /// Hands out `UID-1`, `UID-2`, ...
    #[derive(Default)]
    struct CountingUid(Mutex<u32>);

    impl UidGenerator for CountingUid {
        fn generate(&self, _start: DateTime<Utc>) -> String {
            let mut n = self.0.lock().unwrap();
            *n += 1;
            format!("UID-{n}")
        }
    }

    fn dav(transport: &Arc<ScriptedTransport>) -> DavClient {
        DavClient::new(
            transport.clone(),
            Url::parse("https://dav.example.com/").unwrap(),
            ServerFlavor::Standard,
        )
    }

    fn calendar_url() -> Url {
        Url::parse("https://dav.example.com/cal/home").unwrap()
    }

    mod encoding {
        use super::*;

        #[test]
        fn writes_event_fields() {
            let raw = RawEvent::new(
                "U1",
                EventTime::Utc(utc(2025, 3, 10, 9)),
                EventTime::Utc(utc(2025, 3, 10, 10)),
            )
            .with_summary("Review; part 2")
            .with_location("Room 1")
            .with_description("line one\nline two");
            let body = encode_event(&raw, "me@example.com", utc(2025, 3, 1, 0));

            assert!(body.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
            assert!(body.contains(&format!("PRODID:{PRODID}\r\n")));
            assert!(body.contains("UID:U1\r\n"));
            assert!(body.contains("DTSTAMP:20250301T000000Z\r\n"));
            assert!(body.contains("DTSTART:20250310T090000Z\r\n"));
            assert!(body.contains("DTEND:20250310T100000Z\r\n"));
            assert!(body.contains("SUMMARY:Review\\; part 2\r\n"));
            assert!(body.contains("DESCRIPTION:line one\\nline two\r\n"));
            assert!(!body.contains("ORGANIZER"));
            assert!(!body.contains("VTIMEZONE"));
            assert!(body.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));
        }

        #[test]
        fn attendees_skip_self_and_add_organizer_pair() {
            let raw = RawEvent::new(
                "U1",
                EventTime::Utc(utc(2025, 3, 10, 9)),
                EventTime::Utc(utc(2025, 3, 10, 10)),
            )
            .with_attendee(RawAttendee::new("ME@example.com"))
            .with_attendee(RawAttendee::new("guest@example.com"));
            let body = encode_event(&raw, "me@example.com", utc(2025, 3, 1, 0)).replace("\r\n ", "");

            assert!(body.contains(
                "ATTENDEE;PARTSTAT=NEEDS-ACTION;ROLE=REQ-PARTICIPANT;RSVP=TRUE:mailto:guest@example.com\r\n"
            ));
            assert!(!body.contains("mailto:ME@example.com"));
            assert!(body.contains("ORGANIZER;CN=Organizer:mailto:me@example.com\r\n"));
            assert!(body.contains("ATTENDEE;CN=Organizer:mailto:me@example.com\r\n"));
        }

        #[test]
        fn only_self_attendee_writes_nothing() {
            let raw = RawEvent::new(
                "U1",
                EventTime::Utc(utc(2025, 3, 10, 9)),
                EventTime::Utc(utc(2025, 3, 10, 10)),
            )
            .with_attendee(RawAttendee::new("me@example.com"));
            let body = encode_event(&raw, "me@example.com", utc(2025, 3, 1, 0));
            assert!(!body.contains("ATTENDEE"));
            assert!(!body.contains("ORGANIZER"));
        }

        #[test]
        fn zoned_times_embed_vtimezone() {
            let draft = EventDraft::new(utc(2025, 7, 1, 7), utc(2025, 7, 1, 8))
                .with_timezone("Europe/Paris");
            let raw = raw_from_draft(&draft, "U2").unwrap();
            let body = encode_event(&raw, "me@example.com", utc(2025, 3, 1, 0));

            assert_eq!(body.matches("BEGIN:VTIMEZONE").count(), 1);
            assert!(body.contains("TZID:Europe/Paris\r\n"));
            assert!(body.contains("TZOFFSETTO:+0200\r\n"));
            assert!(body.contains("DTSTART;TZID=Europe/Paris:20250701T090000\r\n"));
            assert!(body.contains("DTEND;TZID=Europe/Paris:20250701T100000\r\n"));
        }

        #[test]
        fn all_day_uses_dates() {
            let draft = EventDraft::new(utc(2025, 3, 10, 0), utc(2025, 3, 11, 0)).all_day();
            let raw = raw_from_draft(&draft, "U3").unwrap();
            let body = encode_event(&raw, "me@example.com", utc(2025, 3, 1, 0));
            assert!(body.contains("DTSTART;VALUE=DATE:20250310\r\n"));
            assert!(body.contains("DTEND;VALUE=DATE:20250311\r\n"));
        }

        #[test]
        fn encoded_body_parses_back() {
            let draft = EventDraft::new(utc(2025, 3, 10, 9), utc(2025, 3, 10, 10))
                .with_summary("Budget, Q2")
                .with_location("HQ")
                .with_description("Agenda:\n- numbers\n- more numbers")
                .with_timezone("America/New_York");
            let raw = raw_from_draft(&draft, "U4").unwrap();
            let parsed = parse_calendar_data(&encode_event(&raw, "me@example.com", utc(2025, 3, 1, 0)));

            assert_eq!(parsed.len(), 1);
            assert_eq!(parsed[0].summary.as_deref(), Some("Budget, Q2"));
            assert_eq!(parsed[0].description, raw.description);
            assert_eq!(parsed[0].start.to_utc(), utc(2025, 3, 10, 9));
            assert_eq!(parsed[0].end.to_utc(), utc(2025, 3, 10, 10));
        }

        #[test]
        fn folds_long_lines() {
            let line = format!("DESCRIPTION:{}", "é".repeat(60));
            let folded = fold_line(&line);
            for part in folded.split("\r\n") {
                assert!(part.len() <= 75);
            }
            assert_eq!(folded.replace("\r\n ", ""), line);
            assert_eq!(fold_line("SUMMARY:short"), "SUMMARY:short");
        }

        #[test]
        fn offsets() {
            assert_eq!(format_offset(3600), "+0100");
            assert_eq!(format_offset(-5 * 3600 - 1800), "-0530");
            assert_eq!(format_offset(0), "+0000");
        }
    }

    mod create_state {
        use super::*;

        #[test]
        fn succeeds_on_created() {
            let state = CreateState::start().on_status(201, 10);
            assert_eq!(state, CreateState::Succeeded(1));
            assert!(state.is_terminal());
        }

        #[test]
        fn conflicts_until_budget() {
            let mut state = CreateState::start();
            for attempt in 1..10 {
                state = state.on_status(412, 10);
                assert_eq!(state, CreateState::Conflict(attempt));
                assert!(!state.is_terminal());
                state = state.retry();
            }
            assert_eq!(state, CreateState::Attempting(10));
            state = state.on_status(412, 10);
            assert_eq!(state, CreateState::ExhaustedRetries(10));
            assert_eq!(state.attempts(), 10);
        }

        #[test]
        fn auth_and_server_statuses_fail_at_once() {
            for status in [401, 403, 500, 503] {
                let state = CreateState::Attempting(3).on_status(status, 10);
                assert_eq!(state, CreateState::Failed(3), "status {status}");
                assert!(state.is_terminal());
            }
        }

        #[test]
        fn other_client_errors_are_conflicts() {
            for status in [400, 404, 409, 412, 415] {
                assert_eq!(
                    CreateState::start().on_status(status, 10),
                    CreateState::Conflict(1),
                    "status {status}"
                );
            }
        }

        #[test]
        fn terminal_states_stay_put() {
            assert_eq!(
                CreateState::Succeeded(2).on_status(412, 10),
                CreateState::Succeeded(2)
            );
            assert_eq!(
                CreateState::ExhaustedRetries(3).retry(),
                CreateState::ExhaustedRetries(3)
            );
        }
    }

    mod writer {
        use super::*;

        #[tokio::test]
        async fn create_retries_with_fresh_uid() {
            let transport = Arc::new(ScriptedTransport::new());
            transport.push(412, "");
            transport.push(409, "");
            transport.push(201, "");
            let dav = dav(&transport);
            let uids = CountingUid::default();
            let writer = EventWriter {
                dav: &dav,
                account_email: "me@example.com",
                create_attempts: 10,
                uids: &uids,
            };

            let draft = EventDraft::new(utc(2025, 3, 10, 9), utc(2025, 3, 10, 10));
            let created = writer.create(&calendar_url(), "/cal/home/", &draft).await.unwrap();

            assert_eq!(created.event_id, "UID-3");
            assert_eq!(created.calendar_id, "/cal/home/");
            assert_eq!(created.event_url, "/cal/home/UID-3.ics");

            let requests = transport.requests();
            assert_eq!(requests.len(), 3);
            let paths: Vec<_> = requests.iter().map(|r| r.url.path().to_string()).collect();
            assert_eq!(
                paths,
                vec!["/cal/home/UID-1.ics", "/cal/home/UID-2.ics", "/cal/home/UID-3.ics"]
            );
            for request in &requests {
                assert_eq!(request.method, DavMethod::Put);
                assert_eq!(request.header("If-None-Match"), Some("*"));
                assert!(request.header("Content-Type").unwrap().starts_with("text/calendar"));
            }
        }

        #[tokio::test]
        async fn create_gives_up_after_ten_attempts() {
            let transport = Arc::new(ScriptedTransport::new());
            for _ in 0..12 {
                transport.push(412, "");
            }
            let dav = dav(&transport);
            let writer = EventWriter {
                dav: &dav,
                account_email: "me@example.com",
                create_attempts: 10,
                uids: &RandomUid,
            };

            let draft = EventDraft::new(utc(2025, 3, 10, 9), utc(2025, 3, 10, 10));
            let err = writer.create(&calendar_url(), "/cal/home/", &draft).await.unwrap_err();

            assert_eq!(err.code(), CalDavErrorCode::Conflict);
            assert_eq!(transport.requests().len(), 10);
            assert_eq!(transport.remaining(), 2);
        }

        #[tokio::test]
        async fn create_reports_rejected_credentials() {
            let transport = Arc::new(ScriptedTransport::new());
            transport.push(412, "");
            transport.push(401, "");
            transport.push(201, "");
            let dav = dav(&transport);
            let uids = CountingUid::default();
            let writer = EventWriter {
                dav: &dav,
                account_email: "me@example.com",
                create_attempts: 10,
                uids: &uids,
            };

            let draft = EventDraft::new(utc(2025, 3, 10, 9), utc(2025, 3, 10, 10));
            let err = writer.create(&calendar_url(), "/cal/home/", &draft).await.unwrap_err();
            assert_eq!(err.code(), CalDavErrorCode::Authentication);
            assert_eq!(transport.requests().len(), 2);
            assert_eq!(transport.remaining(), 1);
        }

        #[tokio::test]
        async fn create_reports_server_failure() {
            let transport = Arc::new(ScriptedTransport::new());
            transport.push(503, "");
            transport.push(201, "");
            let dav = dav(&transport);
            let writer = EventWriter {
                dav: &dav,
                account_email: "me@example.com",
                create_attempts: 10,
                uids: &RandomUid,
            };

            let draft = EventDraft::new(utc(2025, 3, 10, 9), utc(2025, 3, 10, 10));
            let err = writer.create(&calendar_url(), "/cal/home/", &draft).await.unwrap_err();
            assert_eq!(err.code(), CalDavErrorCode::Server);
            assert_eq!(transport.requests().len(), 1);
        }

        #[tokio::test]
        async fn create_stops_on_transport_error() {
            let transport = Arc::new(ScriptedTransport::new());
            transport.push(412, "");
            transport.push_error(CalDavError::transport("reset"));
            let dav = dav(&transport);
            let uids = CountingUid::default();
            let writer = EventWriter {
                dav: &dav,
                account_email: "me@example.com",
                create_attempts: 10,
                uids: &uids,
            };

            let draft = EventDraft::new(utc(2025, 3, 10, 9), utc(2025, 3, 10, 10));
            let err = writer.create(&calendar_url(), "/cal/home/", &draft).await.unwrap_err();
            assert_eq!(err.code(), CalDavErrorCode::Transport);
            assert_eq!(transport.requests().len(), 2);
        }

        #[tokio::test]
        async fn update_and_delete_outcomes() {
            let transport = Arc::new(ScriptedTransport::new());
            transport.push(204, "");
            transport.push(200, "");
            transport.push(412, "");
            transport.push(204, "");
            transport.push(200, "");
            let dav = dav(&transport);
            let writer = EventWriter {
                dav: &dav,
                account_email: "me@example.com",
                create_attempts: 10,
                uids: &RandomUid,
            };

            let url = Url::parse("https://dav.example.com/cal/home/U9.ics").unwrap();
            let draft = EventDraft::new(utc(2025, 3, 10, 9), utc(2025, 3, 10, 10));
            assert!(writer.update(&url, &draft).await.unwrap());
            assert!(writer.update(&url, &draft).await.unwrap());
            assert!(!writer.update(&url, &draft).await.unwrap());
            assert!(writer.delete(&url).await.unwrap());
            assert!(!writer.delete(&url).await.unwrap());

            let requests = transport.requests();
            assert_eq!(requests[0].header("If-Match"), Some("*"));
            assert!(requests[0].body.as_deref().unwrap().contains("UID:U9\r\n"));
            assert_eq!(requests[3].method, DavMethod::Delete);
        }
    }

    #[test]
    fn random_uid_shape() {
        let uid = RandomUid.generate(utc(2025, 3, 10, 9));
        let (stamp, suffix) = uid.split_once('-').unwrap();
        assert_eq!(stamp, "20250310T090000Z");
        assert_eq!(suffix.len(), 10);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn update_uid_sources() {
        let url = Url::parse("https://dav.example.com/cal/home/abc-123.ics").unwrap();
        let draft = EventDraft::new(utc(2025, 3, 10, 9), utc(2025, 3, 10, 10));
        assert_eq!(update_uid(&draft, &url).unwrap(), "abc-123");
        assert_eq!(
            update_uid(&draft.clone().with_event_id("explicit"), &url).unwrap(),
            "explicit"
        );
        let dir = Url::parse("https://dav.example.com/").unwrap();
        assert!(update_uid(&draft, &dir).is_err());
    }

    #[test]
    fn collection_urls_end_with_slash() {
        assert_eq!(collection_url(&calendar_url()).path(), "/cal/home/");
        let already = Url::parse("https://dav.example.com/cal/home/").unwrap();
        assert_eq!(collection_url(&already), already);
    }
}
