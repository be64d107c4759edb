//! Recurrence expansion and override resolution.
//!
//! Retrieval hands every fetched VEVENT to [`resolve_events`], which
//!
//! 1. expands recurring masters into occurrences overlapping the window,
//! 2. keeps every literal VEVENT (plain events and RECURRENCE-ID overrides),
//! 3. collapses entries sharing a recurrence identity, preferring literals.
//!
//! RRULE semantics are left entirely to the `rrule` crate.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use multical_core::TimeWindow;
use rrule::RRuleSet;
use tracing::{debug, warn};

use crate::raw_event::{EventTime, RawEvent};

/// Upper bound on instances generated per master.
const MAX_OCCURRENCES: u16 = u16::MAX;

/// A fetched or generated event together with the href it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct EventHref {
    pub url: String,
    pub event: RawEvent,
    /// True for instances generated from a master's rule.
    pub is_occurrence: bool,
}

impl EventHref {
    pub fn literal(url: impl Into<String>, event: RawEvent) -> Self {
        Self {
            url: url.into(),
            event,
            is_occurrence: false,
        }
    }

    pub fn occurrence(url: impl Into<String>, event: RawEvent) -> Self {
        Self {
            url: url.into(),
            event,
            is_occurrence: true,
        }
    }

    /// Grouping key: `UID@RECURRENCE-ID` for instances, the href otherwise.
    pub fn identity(&self) -> String {
        self.event
            .recurrence_identity()
            .unwrap_or_else(|| self.url.clone())
    }
}

/// Formats a value the way the `rrule` parser accepts it.
///
/// Dates become midnight UTC and floating times are read as UTC.
fn rrule_line(name: &str, time: &EventTime) -> String {
    match time {
        EventTime::Date(d) => format!("{name}:{}T000000Z", d.format("%Y%m%d")),
        EventTime::Utc(dt) => format!("{name}:{}", dt.format("%Y%m%dT%H%M%SZ")),
        EventTime::Floating(naive) => format!("{name}:{}Z", naive.format("%Y%m%dT%H%M%S")),
        EventTime::Zoned { .. } => time.to_ics_line(name),
    }
}

/// Rewrites `UNTIL` to the UTC form [`rrule_line`] gives DTSTART.
///
/// UNTIL must share DTSTART's value type, so a date or floating bound would
/// be rejected once DTSTART is written in UTC.
fn rrule_text(rule: &str, start: &EventTime) -> String {
    rule.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.trim().eq_ignore_ascii_case("UNTIL") => {
                format!("{key}={}", utc_until(value.trim(), start))
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn utc_until(value: &str, start: &EventTime) -> String {
    if value.ends_with(['Z', 'z']) {
        return value.to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") {
        // a date bound on a timed series covers that whole day
        let time = match start {
            EventTime::Date(_) => NaiveTime::MIN,
            _ => NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
        };
        let bound = match start {
            EventTime::Zoned { tzid, .. } => EventTime::Zoned {
                date_time: date.and_time(time),
                tzid: tzid.clone(),
            }
            .to_utc(),
            _ => date.and_time(time).and_utc(),
        };
        return bound.format("%Y%m%dT%H%M%SZ").to_string();
    }
    let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S") else {
        return value.to_string();
    };
    let bound = match start {
        EventTime::Zoned { tzid, .. } => EventTime::Zoned {
            date_time: naive,
            tzid: tzid.clone(),
        }
        .to_utc(),
        _ => naive.and_utc(),
    };
    bound.format("%Y%m%dT%H%M%SZ").to_string()
}

fn build_rrule_set(master: &RawEvent) -> Option<String> {
    let recurrence = master.recurrence.as_ref()?;
    let mut lines = vec![rrule_line("DTSTART", &master.start)];
    if let Some(rule) = &recurrence.rrule {
        lines.push(format!("RRULE:{}", rrule_text(rule, &master.start)));
    }
    lines.extend(recurrence.rdates.iter().map(|t| rrule_line("RDATE", t)));
    lines.extend(recurrence.exdates.iter().map(|t| rrule_line("EXDATE", t)));
    Some(lines.join("\n"))
}

/// Maps an instance back onto the variant of the master's DTSTART.
fn occurrence_time(dt: &DateTime<rrule::Tz>, master_start: &EventTime) -> EventTime {
    match master_start {
        EventTime::Date(_) => EventTime::Date(dt.with_timezone(&Utc).date_naive()),
        EventTime::Utc(_) => EventTime::Utc(dt.with_timezone(&Utc)),
        EventTime::Floating(_) => EventTime::Floating(dt.with_timezone(&Utc).naive_utc()),
        EventTime::Zoned { tzid, .. } => match EventTime::zone(tzid) {
            Some(tz) => EventTime::Zoned {
                date_time: dt.with_timezone(&tz).naive_local(),
                tzid: tzid.clone(),
            },
            None => EventTime::Utc(dt.with_timezone(&Utc)),
        },
    }
}

/// Expands a recurring master into the occurrences overlapping `window`.
///
/// Each occurrence carries the master's content, its own start/end, and a
/// RECURRENCE-ID equal to its unshifted start. Returns `None` when the rule
/// cannot be evaluated.
pub fn expand(master: &RawEvent, window: &TimeWindow) -> Option<Vec<RawEvent>> {
    let source = build_rrule_set(master)?;
    let rrule_set: RRuleSet = match source.parse() {
        Ok(set) => set,
        Err(e) => {
            warn!(uid = %master.uid, error = %e, "Failed to evaluate recurrence rule");
            return None;
        }
    };

    let duration = master.duration();
    let tz: rrule::Tz = Utc.into();
    // widen by one second on both ends; exact overlap is checked below
    let margin = Duration::seconds(1);
    let after = window
        .start
        .checked_sub_signed(duration + margin)
        .unwrap_or(window.start)
        .with_timezone(&tz);
    let before = window
        .end
        .checked_add_signed(margin)
        .unwrap_or(window.end)
        .with_timezone(&tz);
    let result = rrule_set.after(after).before(before).all(MAX_OCCURRENCES);
    if result.limited {
        warn!(
            uid = %master.uid,
            limit = MAX_OCCURRENCES,
            "Recurrence expansion truncated"
        );
    }

    let occurrences: Vec<RawEvent> = result
        .dates
        .iter()
        .filter_map(|dt| {
            let start = occurrence_time(dt, &master.start);
            let end = start.shifted(duration)?;
            if !window.overlaps(start.to_utc(), end.to_utc()) {
                return None;
            }
            let mut occurrence = master.clone();
            occurrence.recurrence = None;
            occurrence.recurrence_id = Some(start.clone());
            occurrence.start = start;
            occurrence.end = end;
            Some(occurrence)
        })
        .collect();

    debug!(uid = %master.uid, count = occurrences.len(), "Expanded recurring event");
    Some(occurrences)
}

/// Collapses entries sharing an identity to one, preferring literals.
///
/// Group order follows first appearance. Among several literals for the same
/// identity the first one in server order is kept.
pub fn resolve_overrides(pairs: Vec<EventHref>) -> Vec<EventHref> {
    let mut kept: Vec<EventHref> = Vec::with_capacity(pairs.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for pair in pairs {
        let identity = pair.identity();
        match index.get(&identity) {
            Some(&i) => {
                if kept[i].is_occurrence && !pair.is_occurrence {
                    kept[i] = pair;
                }
            }
            None => {
                index.insert(identity, kept.len());
                kept.push(pair);
            }
        }
    }
    kept
}

/// Builds the working set for fetched events and resolves it.
///
/// Recurring masters are replaced by their occurrences. Overrides take part
/// in resolution wherever they were moved to, so the occurrence they replace
/// disappears even when the override itself then falls outside `window` and
/// is dropped. Plain events are kept as the server returned them.
pub fn resolve_events(fetched: Vec<EventHref>, window: &TimeWindow) -> Vec<EventHref> {
    let mut working = Vec::with_capacity(fetched.len());
    for pair in fetched {
        if pair.event.recurs() {
            match expand(&pair.event, window) {
                Some(occurrences) => working.extend(
                    occurrences
                        .into_iter()
                        .map(|event| EventHref::occurrence(pair.url.clone(), event)),
                ),
                None => working.push(pair),
            }
            continue;
        }
        working.push(pair);
    }

    resolve_overrides(working)
        .into_iter()
        .filter(|pair| {
            let outside = !pair.is_occurrence
                && pair.event.recurrence_id.is_some()
                && !window.overlaps(pair.event.start.to_utc(), pair.event.end.to_utc());
            if outside {
                debug!(uid = %pair.event.uid, "Dropping override outside window");
            }
            !outside
        })
        .collect()
}
