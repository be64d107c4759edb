//! CalDAV/WebDAV protocol adapter.
//!
//! # Layers
//!
//! - [`Transport`]: authenticated HTTP(S) exchange, one pooled client per
//!   `host:port`
//! - `xml` / `dialect`: request bodies and multistatus reading, strict or
//!   namespace-agnostic depending on [`ServerFlavor`]
//! - `discovery`: principal → calendar-home-set → event collections
//! - `retrieval` / `recurrence`: calendar-query, one multiget, expansion and
//!   override resolution
//! - `mutation`: iCalendar encoding, create with conflict retry, update,
//!   delete
//!
//! [`CalDavAccount`] ties them together behind
//! [`CalendarAccount`](crate::account::CalendarAccount).
//!
//! # Example
//!
//! ```ignore
//! use multical_caldav::{CalDavAccount, CalDavConfig, CalendarAccount};
//!
//! let config = CalDavConfig::icloud("me@icloud.com", "app-password")?;
//! let account = CalDavAccount::new(config);
//! for calendar in account.discover_calendars().await? {
//!     let events = account.list_events(&calendar.path, None).await?;
//!     println!("{}: {} events", calendar.display_name, events.len());
//! }
//! ```

mod account;
mod auth;
mod client;
mod config;
mod dialect;
mod discovery;
mod ics;
mod mutation;
mod recurrence;
mod retrieval;
mod transport;
mod xml;

#[cfg(test)]
pub(crate) mod testing;

pub use account::CalDavAccount;
pub use auth::Credentials;
pub use client::DavClient;
pub use config::{CalDavConfig, ServerFlavor};
pub use dialect::{CollectionEntry, NamespacedDialect, ResponseDialect, TagNameDialect};
pub use discovery::CalendarCollection;
pub use ics::parse_calendar_data;
pub use mutation::{CreateState, RandomUid, UidGenerator, encode_event};
pub use recurrence::{EventHref, expand, resolve_events, resolve_overrides};
pub use transport::{
    ConnectionPool, DavMethod, DavRequest, DavResponse, HttpTransport, Transport,
};
pub use xml::{CALDAV_NS, DAV_NS, XmlElement};
