//! Calendar listing and credential checks.

use multical_caldav::{CalDavAccount, CalendarAccount, CalendarSummary};
use serde::Serialize;
use tracing::info;

use crate::error::CliResult;

/// Summaries of every event calendar of the account.
pub async fn calendars(account: &CalDavAccount) -> CliResult<Vec<CalendarSummary>> {
    Ok(account.list_calendars().await?)
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub server: String,
    pub username: String,
    pub valid: bool,
}

/// Whether discovery succeeds and finds at least one calendar.
pub async fn check(account: &CalDavAccount) -> CheckReport {
    let valid = account.credentials_valid().await;
    let config = account.config();
    info!(server = %config.url, valid, "Checked credentials");
    CheckReport {
        server: config.url_str().to_string(),
        username: config.username.clone(),
        valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fake::{CannedTransport, account};

    #[tokio::test]
    async fn rejected_credentials_report_invalid() {
        let transport = CannedTransport::with(&[(401, "")]);
        let report = check(&account(transport.clone())).await;
        assert!(!report.valid);
        assert_eq!(report.server, "https://dav.example.com/");
        assert_eq!(report.username, "alice@example.com");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn calendars_propagates_discovery_errors() {
        let transport = CannedTransport::with(&[(503, "")]);
        assert!(calendars(&account(transport)).await.is_err());
    }
}
