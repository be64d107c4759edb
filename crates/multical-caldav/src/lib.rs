//! CalDAV calendar accounts.
//!
//! This crate talks to CalDAV/WebDAV servers on behalf of one account:
//!
//! - [`CalendarAccount`] - the account interface (discover, list, get,
//!   create, update, delete)
//! - [`CalDavAccount`] - its CalDAV implementation
//! - [`RawEvent`] - VEVENT data as parsed from the server
//! - [`normalize_event`] - conversion to [`multical_core::CanonicalEvent`]
//! - [`CalDavError`] - error type shared by every operation
//!
//! # Data flow
//!
//! ```text
//!   PROPFIND ──► discovery ──► Calendar { path, display_name }
//!
//!   REPORT calendar-query ──► hrefs
//!        │
//!        ▼
//!   REPORT calendar-multiget ──► iCalendar bodies ──► RawEvent
//!                                                       │
//!                            expand + resolve overrides ◄┘
//!                                       │
//!                                       ▼ normalize_event()
//!                                 CanonicalEvent
//! ```

pub mod account;
pub mod caldav;
pub mod error;
pub mod normalize;
pub mod raw_event;

pub use account::{BoxFuture, Calendar, CalendarAccount, CalendarSummary, CreatedEvent};
pub use caldav::{CalDavAccount, CalDavConfig, ServerFlavor};
pub use error::{CalDavError, CalDavErrorCode, CalDavResult};
pub use normalize::{normalize_event, raw_from_draft};
pub use raw_event::{Alarm, EventTime, Organizer, RawAttendee, RawEvent, Recurrence};
