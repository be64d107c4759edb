//! Calendar discovery: principal, home sets, event collections.

use std::collections::HashSet;

use tracing::{debug, info, trace, warn};
use url::Url;

use super::client::{DavClient, join};
use super::config::ServerFlavor;
use super::xml::{self, CALDAV_NS, DAV_NS};
use crate::account::Calendar;
use crate::error::{CalDavError, CalDavResult};

/// A discovered event collection and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCollection {
    /// Absolute path; the calendar id.
    pub path: String,
    pub display_name: String,
    /// Full URL, which may be on another host than the server root.
    pub url: Url,
}

impl CalendarCollection {
    pub fn to_calendar(&self) -> Calendar {
        Calendar::new(&self.path, &self.display_name)
    }
}

/// Resolves every VEVENT-capable collection of the account.
///
/// Collections reachable from several home sets are reported once, in the
/// order first seen.
pub async fn discover(dav: &DavClient) -> CalDavResult<Vec<CalendarCollection>> {
    let principal = current_user_principal(dav).await?;
    let homes = calendar_home_sets(dav, &principal).await?;

    let mut seen = HashSet::new();
    let mut calendars = Vec::new();
    for home in &homes {
        for collection in list_collections(dav, home).await? {
            if seen.insert(collection.path.clone()) {
                calendars.push(collection);
            } else {
                trace!(path = %collection.path, "Duplicate calendar");
            }
        }
    }

    info!(
        homes = homes.len(),
        count = calendars.len(),
        "Discovered calendars"
    );
    Ok(calendars)
}

async fn current_user_principal(dav: &DavClient) -> CalDavResult<Url> {
    let url = dav.base_url().clone();
    let root = dav
        .propfind(&url, xml::principal_body(dav.prefixes())?)
        .await?;

    let dialect = dav.dialect();
    let href = dialect
        .responses(&root)
        .into_iter()
        .flat_map(|r| dialect.extract_property_hrefs(r, DAV_NS, "current-user-principal"))
        .next()
        .ok_or_else(|| CalDavError::protocol("server reported no current-user-principal"))?;

    debug!(principal = %href, "Found principal");
    join(&url, &href)
}

async fn calendar_home_sets(dav: &DavClient, principal: &Url) -> CalDavResult<Vec<Url>> {
    let root = dav
        .propfind(principal, xml::home_set_body(dav.prefixes())?)
        .await?;

    let dialect = dav.dialect();
    let hrefs: Vec<String> = dialect
        .responses(&root)
        .into_iter()
        .flat_map(|r| dialect.extract_property_hrefs(r, CALDAV_NS, "calendar-home-set"))
        .collect();

    if !hrefs.is_empty() {
        return hrefs.iter().map(|href| join(principal, href)).collect();
    }

    match dav.flavor() {
        ServerFlavor::ICloud => {
            let home = icloud_home_set(principal).ok_or_else(|| {
                CalDavError::protocol(format!("cannot derive calendar home from {principal}"))
            })?;
            debug!(home = %home, "Using derived iCloud calendar home");
            Ok(vec![home])
        }
        ServerFlavor::Standard => Err(CalDavError::protocol(format!(
            "principal {principal} has no calendar-home-set"
        ))),
    }
}

/// `/<account id>/calendars/` on the principal's host.
pub fn icloud_home_set(principal: &Url) -> Option<Url> {
    let id = principal.path().split('/').nth(1).filter(|s| !s.is_empty())?;
    principal.join(&format!("/{id}/calendars/")).ok()
}

async fn list_collections(dav: &DavClient, home: &Url) -> CalDavResult<Vec<CalendarCollection>> {
    let root = dav
        .propfind(home, xml::calendar_list_body(dav.prefixes())?)
        .await?;

    let mut collections = Vec::new();
    for entry in dav.dialect().extract_collections(&root) {
        let url = match join(home, &entry.href) {
            Ok(url) => url,
            Err(e) => {
                warn!(href = %entry.href, error = %e, "Skipping unresolvable href");
                continue;
            }
        };
        if same_collection(&url, home) || is_object_entry(url.path()) {
            continue;
        }
        if !entry.is_event_calendar() {
            trace!(
                href = %entry.href,
                collection = entry.is_collection,
                components = ?entry.components,
                "Not an event calendar"
            );
            continue;
        }

        let path = url.path().to_string();
        let display_name = entry
            .display_name
            .unwrap_or_else(|| last_segment(&path).to_string());
        collections.push(CalendarCollection {
            path,
            display_name,
            url,
        });
    }
    Ok(collections)
}

fn same_collection(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
}

/// `*.ics` and `*.eml` entries are stored objects, never calendars.
fn is_object_entry(path: &str) -> bool {
    let lower = path.trim_end_matches('/').to_ascii_lowercase();
    lower.ends_with(".ics") || lower.ends_with(".eml")
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(path)
}
