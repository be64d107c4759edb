//! Parsed VEVENT data as it comes off the wire.
//!
//! A [`RawEvent`] keeps what the iCalendar body said, including the original
//! timezone form of every date-time, so that recurrence expansion and
//! override matching work on the same values the server stored. It is turned
//! into a [`CanonicalEvent`](multical_core::CanonicalEvent) by
//! [`normalize_event`](crate::normalize::normalize_event).

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A DTSTART/DTEND/RECURRENCE-ID/EXDATE value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// `VALUE=DATE`, no time component.
    Date(NaiveDate),
    /// UTC date-time (`...Z`).
    Utc(DateTime<Utc>),
    /// Floating local time without zone information.
    Floating(NaiveDateTime),
    /// Local time in a named zone (`TZID=...`).
    Zoned { date_time: NaiveDateTime, tzid: String },
}

impl EventTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    pub fn tzid(&self) -> Option<&str> {
        match self {
            Self::Zoned { tzid, .. } => Some(tzid),
            _ => None,
        }
    }

    /// Looks up an IANA zone name.
    pub fn zone(tzid: &str) -> Option<chrono_tz::Tz> {
        tzid.parse::<chrono_tz::Tz>().ok()
    }

    /// Returns this value with its UTC offset applied.
    ///
    /// Floating values and zones unknown to the tz database are read as UTC.
    /// Dates map to midnight UTC.
    pub fn to_fixed(&self) -> DateTime<FixedOffset> {
        match self {
            Self::Date(date) => date.and_time(NaiveTime::MIN).and_utc().fixed_offset(),
            Self::Utc(dt) => dt.fixed_offset(),
            Self::Floating(naive) => naive.and_utc().fixed_offset(),
            Self::Zoned { date_time, tzid } => match Self::zone(tzid) {
                Some(tz) => match tz.from_local_datetime(date_time).earliest() {
                    Some(local) => local.fixed_offset(),
                    // nonexistent local time (spring-forward gap)
                    None => tz.from_utc_datetime(date_time).fixed_offset(),
                },
                None => date_time.and_utc().fixed_offset(),
            },
        }
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        self.to_fixed().with_timezone(&Utc)
    }

    /// Key identifying the instant this value designates.
    ///
    /// Dates keep their date form; every timed variant is normalized to UTC so
    /// that a `RECURRENCE-ID;TZID=...` override matches an occurrence computed
    /// from a UTC master and vice versa.
    pub fn identity_key(&self) -> String {
        match self {
            Self::Date(date) => date.format("%Y%m%d").to_string(),
            other => other.to_utc().format("%Y%m%dT%H%M%SZ").to_string(),
        }
    }

    /// Shifts the value by `delta`, keeping its variant.
    ///
    /// Dates move by whole days only. `None` when the result leaves chrono's
    /// representable range.
    pub fn shifted(&self, delta: Duration) -> Option<Self> {
        Some(match self {
            Self::Date(date) => {
                Self::Date(date.checked_add_signed(Duration::try_days(delta.num_days())?)?)
            }
            Self::Utc(dt) => Self::Utc(dt.checked_add_signed(delta)?),
            Self::Floating(naive) => Self::Floating(naive.checked_add_signed(delta)?),
            Self::Zoned { date_time, tzid } => Self::Zoned {
                date_time: date_time.checked_add_signed(delta)?,
                tzid: tzid.clone(),
            },
        })
    }

    /// Renders the value as an iCalendar content line for `name`
    /// (`DTSTART`, `EXDATE`, ...).
    ///
    /// Zones unknown to the tz database are written in UTC form.
    pub fn to_ics_line(&self, name: &str) -> String {
        match self {
            Self::Date(date) => format!("{name};VALUE=DATE:{}", date.format("%Y%m%d")),
            Self::Utc(dt) => format!("{name}:{}", dt.format("%Y%m%dT%H%M%SZ")),
            Self::Floating(naive) => format!("{name}:{}", naive.format("%Y%m%dT%H%M%S")),
            Self::Zoned { date_time, tzid } if Self::zone(tzid).is_some() => {
                format!("{name};TZID={tzid}:{}", date_time.format("%Y%m%dT%H%M%S"))
            }
            Self::Zoned { .. } => format!("{name}:{}", self.to_utc().format("%Y%m%dT%H%M%SZ")),
        }
    }
}

/// An ATTENDEE property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttendee {
    pub email: String,
    pub display_name: Option<String>,
    /// PARTSTAT parameter as written (`ACCEPTED`, `NEEDS-ACTION`, ...).
    pub partstat: Option<String>,
}

impl RawAttendee {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            partstat: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_partstat(mut self, partstat: impl Into<String>) -> Self {
        self.partstat = Some(partstat.into());
        self
    }
}

/// The ORGANIZER property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organizer {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// A VALARM sub-component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub action: Option<String>,
    /// TRIGGER value, e.g. `-PT15M`.
    pub trigger: Option<String>,
    pub description: Option<String>,
}

/// Recurrence properties of a master event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    /// RRULE value without the `RRULE:` prefix.
    pub rrule: Option<String>,
    pub rdates: Vec<EventTime>,
    pub exdates: Vec<EventTime>,
}

impl Recurrence {
    /// Returns true if the rule or RDATEs generate instances.
    pub fn generates(&self) -> bool {
        self.rrule.is_some() || !self.rdates.is_empty()
    }
}

/// One VEVENT component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Never empty; components without a UID are dropped while parsing.
    pub uid: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub organizer: Option<Organizer>,
    pub attendees: Vec<RawAttendee>,
    pub recurrence: Option<Recurrence>,
    /// Set on override instances and on generated occurrences.
    pub recurrence_id: Option<EventTime>,
    pub alarms: Vec<Alarm>,
    pub status: Option<String>,
}

impl RawEvent {
    pub fn new(uid: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            uid: uid.into(),
            summary: None,
            description: None,
            location: None,
            start,
            end,
            organizer: None,
            attendees: Vec::new(),
            recurrence: None,
            recurrence_id: None,
            alarms: Vec::new(),
            status: None,
        }
    }

    /// Returns true for recurring masters.
    pub fn recurs(&self) -> bool {
        self.recurrence_id.is_none() && self.recurrence.as_ref().is_some_and(Recurrence::generates)
    }

    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Length of one instance.
    pub fn duration(&self) -> Duration {
        match (&self.start, &self.end) {
            (EventTime::Date(start), EventTime::Date(end)) => Duration::days((*end - *start).num_days()),
            (start, end) => end.to_utc() - start.to_utc(),
        }
    }

    /// `UID` plus the normalized RECURRENCE-ID, when there is one.
    pub fn recurrence_identity(&self) -> Option<String> {
        self.recurrence_id
            .as_ref()
            .map(|rid| format!("{}@{}", self.uid, rid.identity_key()))
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_attendee(mut self, attendee: RawAttendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    pub fn with_organizer(mut self, email: impl Into<String>, name: Option<String>) -> Self {
        self.organizer = Some(Organizer {
            email: Some(email.into()),
            display_name: name,
        });
        self
    }

    pub fn with_rrule(mut self, rrule: impl Into<String>) -> Self {
        self.recurrence.get_or_insert_with(Recurrence::default).rrule = Some(rrule.into());
        self
    }

    pub fn with_recurrence_id(mut self, recurrence_id: EventTime) -> Self {
        self.recurrence_id = Some(recurrence_id);
        self
    }
}
