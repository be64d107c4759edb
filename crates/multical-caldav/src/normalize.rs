//! Conversion between [`RawEvent`] and the canonical event types.
//!
//! - [`normalize_event`]: a parsed (or generated) VEVENT to a
//!   [`CanonicalEvent`], the read path
//! - [`raw_from_draft`]: caller-supplied [`EventDraft`] fields to the
//!   [`RawEvent`] that gets encoded and stored, the write path
//!
//! Both directions are pure. Text is passed through as-is apart from the
//! `\"` cleanup some servers need; nothing is HTML-escaped.

use chrono::Duration;
use multical_core::{
    CanonicalAttendee, CanonicalEvent, EventDateTime, EventDraft, ORGANIZER_STATUS, UNKNOWN_STATUS,
};

use crate::error::{CalDavError, CalDavResult};
use crate::raw_event::{EventTime, RawAttendee, RawEvent};

/// Converts a [`RawEvent`] read from `url` in calendar `calendar_id`.
pub fn normalize_event(raw: &RawEvent, url: &str, calendar_id: &str) -> CanonicalEvent {
    let start = convert_time(&raw.start);
    let end = convert_time(&raw.end);

    CanonicalEvent::new(&raw.uid, start, end, calendar_id)
        .with_summary(clean_text(raw.summary.as_deref()))
        .with_description(clean_text(raw.description.as_deref()))
        .with_location(clean_text(raw.location.as_deref()))
        .with_attendees(convert_attendees(raw))
        .with_html_link(url)
}

/// Date values stay dates; everything else keeps its offset and zone name.
fn convert_time(time: &EventTime) -> EventDateTime {
    match time {
        EventTime::Date(date) => EventDateTime::all_day(*date),
        EventTime::Zoned { tzid, .. } if EventTime::zone(tzid).is_some() => {
            EventDateTime::zoned(time.to_fixed(), tzid)
        }
        _ => EventDateTime::timed(time.to_fixed()),
    }
}

fn clean_text(value: Option<&str>) -> String {
    value.map(unquote).unwrap_or_default()
}

/// Turns `\"` sequences into plain quotes.
pub fn unquote(value: &str) -> String {
    value.replace("\\\"", "\"")
}

/// Maps attendees and flags the organizer.
///
/// The first attendee whose address matches the ORGANIZER is flagged. When
/// none does, the organizer is appended as its own entry.
fn convert_attendees(raw: &RawEvent) -> Vec<CanonicalAttendee> {
    let organizer = raw
        .organizer
        .as_ref()
        .and_then(|o| o.email.as_deref().map(|email| (email, o.display_name.as_deref())));

    let mut flagged = false;
    let mut attendees: Vec<CanonicalAttendee> = raw
        .attendees
        .iter()
        .map(|a| {
            let attendee = CanonicalAttendee::new(&a.email)
                .with_display_name(clean_text(a.display_name.as_deref()))
                .with_response_status(a.partstat.as_deref().unwrap_or(UNKNOWN_STATUS));
            let is_organizer = !flagged
                && organizer.is_some_and(|(email, _)| email.eq_ignore_ascii_case(&a.email));
            if is_organizer {
                flagged = true;
                attendee.as_organizer()
            } else {
                attendee
            }
        })
        .collect();

    if !flagged && let Some((email, name)) = organizer {
        attendees.push(
            CanonicalAttendee::new(email)
                .with_display_name(clean_text(name))
                .with_response_status(ORGANIZER_STATUS)
                .as_organizer(),
        );
    }
    attendees
}

/// Builds the event to store for `draft` under `uid`.
///
/// All-day drafts become date values; the end date is kept as supplied
/// unless it falls on the start date, in which case the event spans one day.
/// Timed drafts are written in their IANA zone when one is given, in UTC
/// otherwise.
///
/// # Errors
///
/// Returns an invalid-input error for unknown zone names or an end before
/// the start.
pub fn raw_from_draft(draft: &EventDraft, uid: &str) -> CalDavResult<RawEvent> {
    if draft.end < draft.start {
        return Err(CalDavError::invalid_input(format!(
            "event end {} is before its start {}",
            draft.end, draft.start
        )));
    }

    let (start, end) = if draft.all_day {
        let start = draft.start.date_naive();
        let end = draft.end.date_naive().max(start);
        let end = if end == start { start + Duration::days(1) } else { end };
        (EventTime::Date(start), EventTime::Date(end))
    } else {
        (
            draft_time(draft.start, draft.start_timezone.as_deref())?,
            draft_time(draft.end, draft.effective_end_timezone())?,
        )
    };

    let mut raw = RawEvent::new(uid, start, end);
    raw.summary = non_empty(&draft.summary);
    raw.description = non_empty(&draft.description);
    raw.location = non_empty(&draft.location);
    raw.attendees = draft
        .attendees
        .iter()
        .map(|email| email.trim())
        .filter(|email| !email.is_empty())
        .map(RawAttendee::new)
        .collect();
    Ok(raw)
}

fn draft_time(instant: chrono::DateTime<chrono::Utc>, zone: Option<&str>) -> CalDavResult<EventTime> {
    let Some(name) = zone else {
        return Ok(EventTime::Utc(instant));
    };
    let tz = EventTime::zone(name)
        .ok_or_else(|| CalDavError::invalid_input(format!("unknown timezone '{name}'")))?;
    Ok(EventTime::Zoned {
        date_time: instant.with_timezone(&tz).naive_local(),
        tzid: name.to_string(),
    })
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
