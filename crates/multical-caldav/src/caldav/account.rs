//! [`CalendarAccount`] implementation for CalDAV servers.

use std::sync::Arc;

use chrono::Utc;
use multical_core::{CanonicalEvent, EventDraft, TimeWindow};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use super::client::{DavClient, join};
use super::config::CalDavConfig;
use super::discovery::{CalendarCollection, discover};
use super::mutation::{EventWriter, RandomUid, UidGenerator};
use super::retrieval::{fetch_event, fetch_events};
use super::transport::{HttpTransport, Transport};
use super::xml;
use crate::account::{BoxFuture, Calendar, CalendarAccount, CalendarSummary, CreatedEvent};
use crate::error::CalDavResult;

/// One CalDAV account session.
///
/// Owns its connection pool (through the transport) and lazily caches the
/// discovered calendar list. Neither is ever invalidated; build a new account
/// to start over.
pub struct CalDavAccount {
    config: CalDavConfig,
    dav: DavClient,
    uids: Box<dyn UidGenerator>,
    calendars: Mutex<Option<Vec<CalendarCollection>>>,
}

impl CalDavAccount {
    /// Creates an account talking HTTP(S) to the configured server.
    pub fn new(config: CalDavConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(&config));
        Self::with_transport(config, transport)
    }

    /// Creates an account over a custom transport.
    pub fn with_transport(config: CalDavConfig, transport: Arc<dyn Transport>) -> Self {
        let dav = DavClient::new(transport, config.url.clone(), config.flavor);
        Self {
            config,
            dav,
            uids: Box::new(RandomUid),
            calendars: Mutex::new(None),
        }
    }

    pub fn with_uid_generator(mut self, uids: impl UidGenerator + 'static) -> Self {
        self.uids = Box::new(uids);
        self
    }

    pub fn config(&self) -> &CalDavConfig {
        &self.config
    }

    /// Discovered calendars, resolved on first use and cached afterwards.
    pub async fn calendars(&self) -> CalDavResult<Vec<Calendar>> {
        Ok(self
            .collections()
            .await?
            .iter()
            .map(CalendarCollection::to_calendar)
            .collect())
    }

    /// Calendar summaries numbered in discovery order.
    pub async fn list_calendars(&self) -> CalDavResult<Vec<CalendarSummary>> {
        Ok(CalendarSummary::from_calendars(&self.calendars().await?))
    }

    /// Lists events of several calendars, concatenated in the order given.
    ///
    /// Ids that are not among the discovered calendars are skipped.
    pub async fn list_events_in(
        &self,
        calendar_ids: &[String],
        window: Option<TimeWindow>,
    ) -> CalDavResult<Vec<CanonicalEvent>> {
        let collections = self.collections().await?;
        let default_span = self.default_span();

        let mut events = Vec::new();
        for id in calendar_ids {
            let Some(collection) = collections.iter().find(|c| &c.path == id) else {
                debug!(calendar = %id, "Skipping unknown calendar");
                continue;
            };
            events.extend(
                fetch_events(&self.dav, &collection.url, &collection.path, window, default_span)
                    .await?,
            );
        }
        Ok(events)
    }

    /// Runs a calendar-query and returns the server's answer unparsed.
    pub async fn raw_report(
        &self,
        calendar_path: &str,
        window: Option<TimeWindow>,
    ) -> CalDavResult<String> {
        let url = self.calendar_url(calendar_path).await?;
        let body = xml::calendar_query_body(self.dav.prefixes(), window.as_ref())?;
        self.dav.report_raw(&url, body).await
    }

    async fn collections(&self) -> CalDavResult<Vec<CalendarCollection>> {
        let mut cached = self.calendars.lock().await;
        if let Some(collections) = cached.as_ref() {
            return Ok(collections.clone());
        }
        let collections = discover(&self.dav).await?;
        *cached = Some(collections.clone());
        Ok(collections)
    }

    /// Where `path` lives: its discovered URL when known, otherwise the path
    /// on the server root.
    async fn calendar_url(&self, path: &str) -> CalDavResult<Url> {
        if let Some(collections) = self.calendars.lock().await.as_ref()
            && let Some(collection) = collections.iter().find(|c| c.path == path)
        {
            return Ok(collection.url.clone());
        }
        self.dav.resolve(path)
    }

    fn default_span(&self) -> TimeWindow {
        TimeWindow::around(Utc::now(), self.config.default_span_years)
    }

    fn writer(&self) -> EventWriter<'_> {
        EventWriter {
            dav: &self.dav,
            account_email: self.config.account_email(),
            create_attempts: self.config.create_attempts,
            uids: self.uids.as_ref(),
        }
    }
}

impl CalendarAccount for CalDavAccount {
    fn name(&self) -> &str {
        "caldav"
    }

    fn discover_calendars(&self) -> BoxFuture<'_, CalDavResult<Vec<Calendar>>> {
        Box::pin(async move {
            let collections = discover(&self.dav).await?;
            Ok(collections.iter().map(CalendarCollection::to_calendar).collect())
        })
    }

    fn list_events<'a>(
        &'a self,
        calendar_path: &'a str,
        window: Option<TimeWindow>,
    ) -> BoxFuture<'a, CalDavResult<Vec<CanonicalEvent>>> {
        Box::pin(async move {
            let url = self.calendar_url(calendar_path).await?;
            fetch_events(&self.dav, &url, calendar_path, window, self.default_span()).await
        })
    }

    fn get_event<'a>(
        &'a self,
        calendar_path: &'a str,
        event_url: &'a str,
    ) -> BoxFuture<'a, CalDavResult<CanonicalEvent>> {
        Box::pin(async move {
            let url = self.calendar_url(calendar_path).await?;
            fetch_event(&self.dav, &url, calendar_path, event_url).await
        })
    }

    fn create_event<'a>(
        &'a self,
        calendar_path: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, CalDavResult<CreatedEvent>> {
        Box::pin(async move {
            let url = self.calendar_url(calendar_path).await?;
            self.writer().create(&url, calendar_path, draft).await
        })
    }

    fn update_event<'a>(
        &'a self,
        calendar_path: &'a str,
        event_url: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, CalDavResult<bool>> {
        Box::pin(async move {
            let url = join(&self.calendar_url(calendar_path).await?, event_url)?;
            let updated = self.writer().update(&url, draft).await?;
            info!(url = %url, updated, "Update finished");
            Ok(updated)
        })
    }

    fn delete_event<'a>(
        &'a self,
        calendar_path: &'a str,
        event_url: &'a str,
    ) -> BoxFuture<'a, CalDavResult<bool>> {
        Box::pin(async move {
            let url = join(&self.calendar_url(calendar_path).await?, event_url)?;
            let deleted = self.writer().delete(&url).await?;
            info!(url = %url, deleted, "Delete finished");
            Ok(deleted)
        })
    }
}
