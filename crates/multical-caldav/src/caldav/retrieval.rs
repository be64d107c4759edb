//! Event retrieval: calendar-query, one multiget, parse, expand, resolve.

use std::collections::HashSet;

use multical_core::{CanonicalEvent, TimeWindow};
use tracing::{debug, info, trace, warn};
use url::Url;

use super::client::{DavClient, join};
use super::ics::parse_calendar_data;
use super::recurrence::{EventHref, resolve_events};
use super::xml::{self, CALDAV_NS};
use crate::error::{CalDavError, CalDavResult};
use crate::normalize::normalize_event;

/// Hrefs of the calendar objects matching a calendar-query.
///
/// The collection itself and entries with a non-2xx status are skipped;
/// duplicates keep their first position.
pub async fn query_hrefs(
    dav: &DavClient,
    calendar_url: &Url,
    window: Option<&TimeWindow>,
) -> CalDavResult<Vec<String>> {
    let body = xml::calendar_query_body(dav.prefixes(), window)?;
    let root = dav.report(calendar_url, body).await?;
    let dialect = dav.dialect();

    let collection_path = calendar_url.path().trim_end_matches('/');
    let mut seen = HashSet::new();
    let mut hrefs = Vec::new();
    for response in dialect.responses(&root) {
        let Some(href) = dialect.extract_href(response) else {
            continue;
        };
        if let Some(status) = dialect.extract_status(response)
            && !(200..300).contains(&status)
        {
            trace!(href = %href, status, "Skipping query entry");
            continue;
        }
        let is_collection = join(calendar_url, &href)
            .map(|url| url.path().trim_end_matches('/') == collection_path)
            .unwrap_or(false);
        if is_collection {
            continue;
        }
        if seen.insert(href.clone()) {
            hrefs.push(href);
        }
    }
    Ok(hrefs)
}

/// Fetches `calendar-data` for every href in a single REPORT.
///
/// Returns `(href, body)` pairs; hrefs the server answered without a body
/// are dropped.
pub async fn multiget(
    dav: &DavClient,
    calendar_url: &Url,
    hrefs: &[String],
) -> CalDavResult<Vec<(String, String)>> {
    if hrefs.is_empty() {
        return Ok(Vec::new());
    }

    let body = xml::calendar_multiget_body(dav.prefixes(), hrefs)?;
    let root = dav.report(calendar_url, body).await?;
    let dialect = dav.dialect();

    let mut bodies = Vec::with_capacity(hrefs.len());
    for response in dialect.responses(&root) {
        let Some(href) = dialect.extract_href(response) else {
            continue;
        };
        let data = dialect
            .extract_property(response, CALDAV_NS, "calendar-data")
            .map(|d| d.trimmed_text())
            .filter(|d| !d.is_empty());
        match data {
            Some(data) => bodies.push((href, data.to_string())),
            None => warn!(href = %href, "Multiget returned no calendar-data, dropping"),
        }
    }

    debug!(requested = hrefs.len(), received = bodies.len(), "Multiget finished");
    Ok(bodies)
}

/// Lists the events of one calendar.
///
/// The server query is time-ranged only when `window` is given; recurring
/// events are expanded over `window`, or over `default_span` without one.
pub async fn fetch_events(
    dav: &DavClient,
    calendar_url: &Url,
    calendar_id: &str,
    window: Option<TimeWindow>,
    default_span: TimeWindow,
) -> CalDavResult<Vec<CanonicalEvent>> {
    let hrefs = query_hrefs(dav, calendar_url, window.as_ref()).await?;
    if hrefs.is_empty() {
        debug!(calendar = %calendar_id, "Calendar query matched nothing");
        return Ok(Vec::new());
    }

    let bodies = multiget(dav, calendar_url, &hrefs).await?;
    let fetched: Vec<EventHref> = bodies
        .iter()
        .flat_map(|(href, data)| {
            parse_calendar_data(data)
                .into_iter()
                .map(|event| EventHref::literal(href.clone(), event))
        })
        .collect();

    let expansion = window.unwrap_or(default_span);
    let resolved = resolve_events(fetched, &expansion);
    let events: Vec<CanonicalEvent> = resolved
        .iter()
        .map(|pair| normalize_event(&pair.event, &pair.url, calendar_id))
        .collect();

    info!(
        calendar = %calendar_id,
        hrefs = hrefs.len(),
        count = events.len(),
        "Fetched events"
    );
    Ok(events)
}

/// Fetches the event stored at `event_href`.
///
/// A resource holding a recurring master and overrides yields the master,
/// unexpanded.
pub async fn fetch_event(
    dav: &DavClient,
    calendar_url: &Url,
    calendar_id: &str,
    event_href: &str,
) -> CalDavResult<CanonicalEvent> {
    let url = join(calendar_url, event_href)?;
    let body = dav.get(&url).await?;
    let events = parse_calendar_data(&body);

    let event = events
        .iter()
        .find(|e| e.recurrence_id.is_none())
        .or_else(|| events.first())
        .ok_or_else(|| CalDavError::not_found(format!("no event stored at {event_href}")))?;
    Ok(normalize_event(event, event_href, calendar_id))
}
