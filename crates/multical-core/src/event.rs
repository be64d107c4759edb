//! Canonical event types.
//!
//! - [`CanonicalEvent`]: the provider-agnostic event shape returned to callers
//! - [`CanonicalAttendee`]: one attendee entry, with the organizer flagged
//! - [`EventDateTime`]: a timed start/end or a date-only start/end
//! - [`EventDraft`]: caller-supplied fields for creating or updating an event
//!
//! The JSON form of these types follows the account façade's hash layout
//! (`dateTime`/`date`, `htmlLink`, `calId`, ...), so serializing a
//! [`CanonicalEvent`] yields what downstream consumers already expect.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Participation status reported for the synthesized organizer entry.
pub const ORGANIZER_STATUS: &str = "Organizer";

/// Participation status used when an attendee carries no PARTSTAT.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Start or end of a canonical event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventDateTime {
    /// A timed instant with its original UTC offset.
    Timed {
        #[serde(rename = "dateTime")]
        date_time: DateTime<FixedOffset>,
        /// IANA zone name, when the source carried one.
        #[serde(rename = "timeZone", default, skip_serializing_if = "Option::is_none")]
        time_zone: Option<String>,
    },
    /// A calendar date without a time component.
    AllDay { date: NaiveDate },
}

impl EventDateTime {
    /// Creates a timed value.
    pub fn timed(date_time: DateTime<FixedOffset>) -> Self {
        Self::Timed {
            date_time,
            time_zone: None,
        }
    }

    /// Creates a timed value tagged with an IANA zone name.
    pub fn zoned(date_time: DateTime<FixedOffset>, zone: impl Into<String>) -> Self {
        Self::Timed {
            date_time,
            time_zone: Some(zone.into()),
        }
    }

    /// Creates a date-only value.
    pub fn all_day(date: NaiveDate) -> Self {
        Self::AllDay { date }
    }

    /// Returns true for date-only values.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay { .. })
    }

    /// Returns the instant in UTC. Dates map to midnight UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Self::Timed { date_time, .. } => date_time.with_timezone(&Utc),
            Self::AllDay { date } => date.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }

    /// Returns the calendar date of this value in its own offset.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Timed { date_time, .. } => date_time.date_naive(),
            Self::AllDay { date } => *date,
        }
    }
}

/// One attendee of a canonical event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalAttendee {
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    /// Raw participation status (`ACCEPTED`, `NEEDS-ACTION`, ...), or
    /// [`UNKNOWN_STATUS`] / [`ORGANIZER_STATUS`].
    pub response_status: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub organizer: bool,
}

impl CanonicalAttendee {
    /// Creates an attendee with an unknown participation status.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: String::new(),
            response_status: UNKNOWN_STATUS.to_string(),
            organizer: false,
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets the participation status.
    pub fn with_response_status(mut self, status: impl Into<String>) -> Self {
        self.response_status = status.into();
        self
    }

    /// Flags this attendee as the organizer.
    pub fn as_organizer(mut self) -> Self {
        self.organizer = true;
        self
    }
}

/// A provider-agnostic calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// The event UID.
    pub id: String,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub attendees: Vec<CanonicalAttendee>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub all_day: bool,
    /// Path of the calendar the event was read from.
    #[serde(rename = "calId")]
    pub calendar_id: String,
    /// Resource href of the event on the server.
    #[serde(rename = "htmlLink")]
    pub html_link: String,
    pub private: bool,
    pub owned: bool,
}

impl CanonicalEvent {
    /// Creates an event with the required fields. `all_day` follows `start`.
    pub fn new(
        id: impl Into<String>,
        start: EventDateTime,
        end: EventDateTime,
        calendar_id: impl Into<String>,
    ) -> Self {
        let all_day = start.is_all_day();
        Self {
            id: id.into(),
            summary: String::new(),
            description: String::new(),
            location: String::new(),
            attendees: Vec::new(),
            start,
            end,
            all_day,
            calendar_id: calendar_id.into(),
            html_link: String::new(),
            private: false,
            owned: true,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_attendees(mut self, attendees: Vec<CanonicalAttendee>) -> Self {
        self.attendees = attendees;
        self
    }

    pub fn with_html_link(mut self, link: impl Into<String>) -> Self {
        self.html_link = link.into();
        self
    }

    /// Returns the attendee flagged as organizer, if any.
    pub fn organizer(&self) -> Option<&CanonicalAttendee> {
        self.attendees.iter().find(|a| a.organizer)
    }

    /// Returns the start instant in UTC.
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.to_utc()
    }

    /// Returns the end instant in UTC.
    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.to_utc()
    }
}

/// Fields supplied by a caller to create or update an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    /// Existing UID, used by updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    /// IANA zone the start is expressed in. `None` writes UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timezone: Option<String>,
    /// IANA zone for the end. Defaults to the start zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_timezone: Option<String>,
    /// Attendee email addresses.
    #[serde(default)]
    pub attendees: Vec<String>,
}

impl EventDraft {
    /// Creates a draft spanning `[start, end)`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            event_id: None,
            summary: String::new(),
            description: String::new(),
            location: String::new(),
            start,
            end,
            all_day: false,
            start_timezone: None,
            end_timezone: None,
            attendees: Vec::new(),
        }
    }

    pub fn with_event_id(mut self, id: impl Into<String>) -> Self {
        self.event_id = Some(id.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Marks the draft as all-day. Timezones are ignored for all-day drafts.
    pub fn all_day(mut self) -> Self {
        self.all_day = true;
        self
    }

    /// Sets the start zone (and the end zone, unless one is set later).
    pub fn with_timezone(mut self, zone: impl Into<String>) -> Self {
        self.start_timezone = Some(zone.into());
        self
    }

    pub fn with_end_timezone(mut self, zone: impl Into<String>) -> Self {
        self.end_timezone = Some(zone.into());
        self
    }

    pub fn with_attendee(mut self, email: impl Into<String>) -> Self {
        self.attendees.push(email.into());
        self
    }

    /// Returns the zone applying to the end, falling back to the start zone.
    pub fn effective_end_timezone(&self) -> Option<&str> {
        self.end_timezone
            .as_deref()
            .or(self.start_timezone.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod event_date_time {
        use super::*;

        #[test]
        fn timed_serializes_as_date_time() {
            let offset = FixedOffset::east_opt(2 * 3600).unwrap();
            let dt = offset.with_ymd_and_hms(2025, 3, 4, 10, 30, 0).unwrap();
            let json = serde_json::to_value(EventDateTime::timed(dt)).unwrap();
            assert_eq!(json["dateTime"], "2025-03-04T10:30:00+02:00");
            assert!(json.get("timeZone").is_none());
        }

        #[test]
        fn all_day_serializes_as_date() {
            let json = serde_json::to_value(EventDateTime::all_day(date(2025, 3, 4))).unwrap();
            assert_eq!(json, serde_json::json!({ "date": "2025-03-04" }));
        }

        #[test]
        fn deserializes_both_shapes() {
            let timed: EventDateTime =
                serde_json::from_str(r#"{"dateTime":"2025-03-04T10:30:00Z","timeZone":"UTC"}"#)
                    .unwrap();
            assert!(!timed.is_all_day());
            assert_eq!(timed.to_utc(), utc(2025, 3, 4, 10, 30));

            let day: EventDateTime = serde_json::from_str(r#"{"date":"2025-03-04"}"#).unwrap();
            assert!(day.is_all_day());
            assert_eq!(day.date(), date(2025, 3, 4));
        }
    }

    mod canonical_event {
        use super::*;

        #[test]
        fn all_day_follows_start() {
            let event = CanonicalEvent::new(
                "U1",
                EventDateTime::all_day(date(2025, 3, 4)),
                EventDateTime::all_day(date(2025, 3, 5)),
                "/cal/",
            );
            assert!(event.all_day);
            assert!(event.owned);
            assert!(!event.private);
        }

        #[test]
        fn json_layout() {
            let event = CanonicalEvent::new(
                "U1",
                EventDateTime::timed(utc(2025, 3, 4, 9, 0).fixed_offset()),
                EventDateTime::timed(utc(2025, 3, 4, 10, 0).fixed_offset()),
                "/cal/work/",
            )
            .with_summary("Standup")
            .with_html_link("/cal/work/a.ics")
            .with_attendees(vec![
                CanonicalAttendee::new("boss@example.com")
                    .with_response_status(ORGANIZER_STATUS)
                    .as_organizer(),
            ]);

            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["id"], "U1");
            assert_eq!(json["calId"], "/cal/work/");
            assert_eq!(json["htmlLink"], "/cal/work/a.ics");
            assert_eq!(json["all_day"], false);
            assert_eq!(json["attendees"][0]["responseStatus"], "Organizer");
            assert_eq!(json["attendees"][0]["organizer"], true);
            assert_eq!(event.organizer().unwrap().email, "boss@example.com");
        }

        #[test]
        fn organizer_flag_omitted_when_false() {
            let json = serde_json::to_value(CanonicalAttendee::new("a@example.com")).unwrap();
            assert!(json.get("organizer").is_none());
            assert_eq!(json["responseStatus"], "Unknown");
        }
    }

    mod event_draft {
        use super::*;

        #[test]
        fn end_timezone_defaults_to_start() {
            let draft = EventDraft::new(utc(2025, 3, 4, 9, 0), utc(2025, 3, 4, 10, 0))
                .with_timezone("Europe/Paris");
            assert_eq!(draft.effective_end_timezone(), Some("Europe/Paris"));

            let draft = draft.with_end_timezone("America/New_York");
            assert_eq!(draft.effective_end_timezone(), Some("America/New_York"));
        }

        #[test]
        fn deserializes_with_defaults() {
            let draft: EventDraft = serde_json::from_str(
                r#"{"start":"2025-03-04T09:00:00Z","end":"2025-03-04T10:00:00Z","summary":"x"}"#,
            )
            .unwrap();
            assert_eq!(draft.summary, "x");
            assert!(!draft.all_day);
            assert!(draft.attendees.is_empty());
            assert!(draft.event_id.is_none());
        }
    }
}
