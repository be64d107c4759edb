//! Event writes.

use multical_caldav::{CalDavAccount, CalendarAccount, CreatedEvent};
use serde::Serialize;
use tracing::warn;

use crate::cli::EventArgs;
use crate::error::CliResult;

/// Outcome of an update or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub url: String,
    pub ok: bool,
}

pub async fn create(
    account: &CalDavAccount,
    calendar: &str,
    event: &EventArgs,
) -> CliResult<CreatedEvent> {
    let draft = event.to_draft(None);
    Ok(account.create_event(calendar, &draft).await?)
}

pub async fn update(
    account: &CalDavAccount,
    calendar: &str,
    url: &str,
    uid: Option<&str>,
    event: &EventArgs,
) -> CliResult<WriteOutcome> {
    let draft = event.to_draft(uid);
    let ok = account.update_event(calendar, url, &draft).await?;
    if !ok {
        warn!(url, "Server rejected the update");
    }
    Ok(WriteOutcome {
        url: url.to_string(),
        ok,
    })
}

pub async fn delete(account: &CalDavAccount, calendar: &str, url: &str) -> CliResult<WriteOutcome> {
    let ok = account.delete_event(calendar, url).await?;
    if !ok {
        warn!(url, "Server did not delete the event");
    }
    Ok(WriteOutcome {
        url: url.to_string(),
        ok,
    })
}
