//! The calendar account interface.
//!
//! [`CalendarAccount`] is what callers program against: discovery, listing,
//! single-event lookup and mutation, all keyed by calendar path and event
//! href. [`CalDavAccount`](crate::caldav::CalDavAccount) is the CalDAV
//! implementation.

use std::future::Future;
use std::pin::Pin;

use multical_core::{CanonicalEvent, EventDraft, TimeWindow};
use serde::{Deserialize, Serialize};

use crate::error::CalDavResult;

/// A boxed future for async trait methods.
///
/// Keeps [`CalendarAccount`] and [`Transport`](crate::caldav::Transport)
/// object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A calendar collection found by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Calendar {
    /// Absolute collection path on the server; the calendar id.
    pub path: String,
    pub display_name: String,
}

impl Calendar {
    pub fn new(path: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            display_name: display_name.into(),
        }
    }
}

/// Calendar entry as listed to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSummary {
    pub id: String,
    pub summary: String,
    /// 1-based position in discovery order.
    pub color_id: String,
}

impl CalendarSummary {
    /// Numbers calendars from 1 in the order given.
    pub fn from_calendars(calendars: &[Calendar]) -> Vec<Self> {
        calendars
            .iter()
            .enumerate()
            .map(|(i, cal)| Self {
                id: cal.path.clone(),
                summary: cal.display_name.clone(),
                color_id: (i + 1).to_string(),
            })
            .collect()
    }
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    /// The generated UID.
    pub event_id: String,
    pub calendar_id: String,
    /// Href of the stored resource.
    pub event_url: String,
}

/// Operations offered by a calendar account.
///
/// Calendar ids are collection paths as returned by
/// [`discover_calendars`](Self::discover_calendars); event ids on the wire are
/// hrefs (the `htmlLink` of a [`CanonicalEvent`]).
pub trait CalendarAccount: Send + Sync {
    /// Short name of the backend (e.g. "caldav").
    fn name(&self) -> &str;

    /// Resolves the account's calendars from the server.
    fn discover_calendars(&self) -> BoxFuture<'_, CalDavResult<Vec<Calendar>>>;

    /// Lists events of one calendar, recurring events expanded.
    ///
    /// Without a window the whole span around now configured for the account
    /// is expanded and the server query is not time-ranged.
    fn list_events<'a>(
        &'a self,
        calendar_path: &'a str,
        window: Option<TimeWindow>,
    ) -> BoxFuture<'a, CalDavResult<Vec<CanonicalEvent>>>;

    /// Fetches one event by href; `NotFound` when the server has none.
    fn get_event<'a>(
        &'a self,
        calendar_path: &'a str,
        event_url: &'a str,
    ) -> BoxFuture<'a, CalDavResult<CanonicalEvent>>;

    fn create_event<'a>(
        &'a self,
        calendar_path: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, CalDavResult<CreatedEvent>>;

    /// Overwrites the event at `event_url`. `Ok(false)` on a rejected write.
    fn update_event<'a>(
        &'a self,
        calendar_path: &'a str,
        event_url: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, CalDavResult<bool>>;

    /// Deletes the event at `event_url`. `Ok(false)` unless the server
    /// answered 204.
    fn delete_event<'a>(
        &'a self,
        calendar_path: &'a str,
        event_url: &'a str,
    ) -> BoxFuture<'a, CalDavResult<bool>>;

    /// True when discovery succeeds with at least one calendar.
    fn credentials_valid(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            self.discover_calendars()
                .await
                .is_ok_and(|calendars| !calendars.is_empty())
        })
    }
}
