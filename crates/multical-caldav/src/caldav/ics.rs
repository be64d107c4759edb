//! iCalendar parsing and text escaping.
//!
//! Bodies are handed to the `icalendar` crate's parser for the grammar
//! (unfolding, content lines, nested components); this module turns the
//! resulting components into [`RawEvent`]s.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use icalendar::parser::{Component, Property, read_calendar, unfold};
use regex::Regex;
use tracing::{debug, trace, warn};

use crate::raw_event::{Alarm, EventTime, Organizer, RawAttendee, RawEvent, Recurrence};

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])?P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("duration regex should be valid")
});

/// Parses one calendar-data body into its VEVENT components.
///
/// A body may hold a recurring master and any number of overrides. Unparsable
/// bodies and components without a UID or DTSTART are logged and skipped.
pub fn parse_calendar_data(body: &str) -> Vec<RawEvent> {
    let unfolded = unfold(&clean_calendar_data(body));
    let calendar = match read_calendar(&unfolded) {
        Ok(calendar) => calendar,
        Err(e) => {
            warn!(error = %e, "Failed to parse calendar data");
            return Vec::new();
        }
    };

    let mut events = Vec::new();
    for component in &calendar.components {
        collect_events(component, &mut events);
    }
    events
}

/// Strips fragments some servers emit that the parser rejects.
fn clean_calendar_data(body: &str) -> String {
    body.replace("X-ADDRESS=;", "")
}

fn collect_events(component: &Component<'_>, out: &mut Vec<RawEvent>) {
    if component.name == "VEVENT" {
        if let Some(event) = parse_event(component) {
            out.push(event);
        }
        return;
    }
    // VCALENDAR wrappers may survive depending on how the body was framed
    for child in &component.components {
        collect_events(child, out);
    }
}

fn parse_event(vevent: &Component<'_>) -> Option<RawEvent> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.as_ref().trim().to_string())
        .filter(|uid| !uid.is_empty());
    let Some(uid) = uid else {
        warn!("Skipping VEVENT without UID");
        return None;
    };

    let Some(start) = vevent.find_prop("DTSTART").and_then(parse_time_property) else {
        warn!(uid = %uid, "Skipping VEVENT without a readable DTSTART");
        return None;
    };

    let end = match vevent.find_prop("DTEND").and_then(parse_time_property) {
        Some(end) => Some(end),
        None => {
            let length = vevent
                .find_prop("DURATION")
                .and_then(|p| parse_duration(p.val.as_ref()))
                .unwrap_or_else(|| match &start {
                    EventTime::Date(_) => Duration::days(1),
                    _ => Duration::zero(),
                });
            start.shifted(length)
        }
    };
    let Some(end) = end else {
        warn!(uid = %uid, "Skipping VEVENT whose end is out of range");
        return None;
    };

    let mut event = RawEvent::new(uid, start, end);
    event.summary = text_property(vevent, "SUMMARY");
    event.description = text_property(vevent, "DESCRIPTION");
    event.location = text_property(vevent, "LOCATION");
    event.status = vevent.find_prop("STATUS").map(|p| p.val.to_string());
    event.organizer = vevent.find_prop("ORGANIZER").map(parse_organizer);
    event.attendees = vevent
        .properties
        .iter()
        .filter(|p| p.name == "ATTENDEE")
        .map(parse_attendee)
        .collect();
    event.recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .and_then(parse_time_property);

    let recurrence = Recurrence {
        rrule: vevent.find_prop("RRULE").map(|p| p.val.to_string()),
        rdates: multi_time_property(vevent, "RDATE"),
        exdates: multi_time_property(vevent, "EXDATE"),
    };
    if recurrence.generates() || !recurrence.exdates.is_empty() {
        event.recurrence = Some(recurrence);
    }

    event.alarms = vevent
        .components
        .iter()
        .filter(|c| c.name == "VALARM")
        .map(|alarm| Alarm {
            action: alarm.find_prop("ACTION").map(|p| p.val.to_string()),
            trigger: alarm.find_prop("TRIGGER").map(|p| p.val.to_string()),
            description: text_property(alarm, "DESCRIPTION"),
        })
        .collect();

    trace!(
        uid = %event.uid,
        recurs = event.recurs(),
        recurrence_id = ?event.recurrence_id,
        "Parsed VEVENT"
    );
    Some(event)
}

fn param<'a>(prop: &'a Property<'_>, key: &str) -> Option<&'a str> {
    prop.params
        .iter()
        .find(|p| p.key == key)
        .and_then(|p| p.val.as_ref())
        .map(|v| v.as_ref())
}

fn text_property(component: &Component<'_>, name: &str) -> Option<String> {
    component
        .find_prop(name)
        .map(|p| unescape_text(p.val.as_ref()))
}

fn strip_mailto(value: &str) -> &str {
    let value = value.trim();
    match value.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("mailto:") => &value[7..],
        _ => value,
    }
}

/// Display name from `CN`, falling back to the non-standard `NAME`.
fn display_name(prop: &Property<'_>) -> Option<String> {
    param(prop, "CN")
        .or_else(|| param(prop, "NAME"))
        .map(|name| name.trim_matches('"').to_string())
}

/// Email from the `EMAIL` parameter, otherwise the `mailto:` value.
fn email_of(prop: &Property<'_>) -> String {
    param(prop, "EMAIL")
        .map(|e| e.trim_matches('"').to_string())
        .unwrap_or_else(|| strip_mailto(prop.val.as_ref()).to_string())
}

fn parse_attendee(prop: &Property<'_>) -> RawAttendee {
    RawAttendee {
        email: email_of(prop),
        display_name: display_name(prop),
        partstat: param(prop, "PARTSTAT").map(str::to_string),
    }
}

fn parse_organizer(prop: &Property<'_>) -> Organizer {
    let email = email_of(prop);
    Organizer {
        email: (!email.is_empty()).then_some(email),
        display_name: display_name(prop),
    }
}

fn parse_time_property(prop: &Property<'_>) -> Option<EventTime> {
    let is_date = param(prop, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"));
    parse_ical_time(prop.val.as_ref(), param(prop, "TZID"), is_date)
}

/// Collects every value of a multi-valued, comma-separated date property.
fn multi_time_property(component: &Component<'_>, name: &str) -> Vec<EventTime> {
    component
        .properties
        .iter()
        .filter(|p| p.name == name)
        .flat_map(|prop| {
            let tzid = param(prop, "TZID");
            let is_date = param(prop, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"));
            prop.val
                .as_ref()
                .split(',')
                .filter_map(|value| parse_ical_time(value, tzid, is_date))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Parses a DATE or DATE-TIME value.
///
/// - `20250205` (date, also without `VALUE=DATE`)
/// - `20250205T100000Z` (UTC)
/// - `20250205T100000` with a TZID (zoned) or without (floating)
pub fn parse_ical_time(value: &str, tzid: Option<&str>, is_date: bool) -> Option<EventTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if is_date || (value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit())) {
        return NaiveDate::parse_from_str(value.get(..8).unwrap_or(value), "%Y%m%d")
            .ok()
            .map(EventTime::Date);
    }

    if let Some(utc) = value.strip_suffix('Z') {
        return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .ok()
            .map(|dt| EventTime::Utc(dt.and_utc()));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
    Some(match tzid {
        Some(tzid) => EventTime::Zoned {
            date_time: naive,
            tzid: tzid.trim_matches('"').to_string(),
        },
        None => EventTime::Floating(naive),
    })
}

/// Parses an RFC 5545 DURATION value (`PT1H30M`, `P1D`, `-P1W`).
pub fn parse_duration(value: &str) -> Option<Duration> {
    let caps = DURATION_RE.captures(value.trim())?;
    let part = |i: usize| -> i64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(0)
    };
    let total = [
        Duration::try_weeks(part(2)),
        Duration::try_days(part(3)),
        Duration::try_hours(part(4)),
        Duration::try_minutes(part(5)),
        Duration::try_seconds(part(6)),
    ]
    .into_iter()
    .try_fold(Duration::zero(), |acc, d| acc.checked_add(&d?));
    let Some(total) = total else {
        warn!(value, "DURATION out of range");
        return None;
    };
    if caps.get(1).is_some_and(|sign| sign.as_str() == "-") {
        debug!(value, "Negative DURATION");
        Some(-total)
    } else {
        Some(total)
    }
}

/// Escapes a TEXT value for a content line.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Reverses [`escape_text`].
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(next @ ('\\' | ';' | ',')) => out.push(next),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
