//! Event reads: listing, single fetch, raw report.

use chrono::Utc;
use multical_caldav::{CalDavAccount, CalendarAccount};
use multical_core::{CanonicalEvent, TimeWindow};

use crate::cli::WindowArgs;
use crate::error::{CliError, CliResult};

/// Turns optional bounds into a query window.
///
/// No bounds means no window. A single bound is completed with the account's
/// default span on the other side.
pub fn window(args: &WindowArgs, span_years: u32) -> CliResult<Option<TimeWindow>> {
    if args.start.is_none() && args.end.is_none() {
        return Ok(None);
    }
    TimeWindow::complete(args.start, args.end, Utc::now(), span_years)
        .map(Some)
        .ok_or_else(|| CliError::InvalidArgument("--start must not be after --end".to_string()))
}

/// Events of every listed calendar, in calendar order.
pub async fn events(
    account: &CalDavAccount,
    calendars: &[String],
    args: &WindowArgs,
) -> CliResult<Vec<CanonicalEvent>> {
    let window = window(args, account.config().default_span_years)?;
    Ok(account.list_events_in(calendars, window).await?)
}

pub async fn get(account: &CalDavAccount, calendar: &str, url: &str) -> CliResult<CanonicalEvent> {
    Ok(account.get_event(calendar, url).await?)
}

/// The unparsed calendar-query response body.
pub async fn raw_report(
    account: &CalDavAccount,
    calendar: &str,
    args: &WindowArgs,
) -> CliResult<String> {
    let window = window(args, account.config().default_span_years)?;
    Ok(account.raw_report(calendar, window).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fake::{CannedTransport, account};
    use chrono::TimeZone;
    use multical_caldav::CalDavErrorCode;

    fn at(day: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn no_bounds_means_no_window() {
        assert_eq!(window(&WindowArgs::default(), 1).unwrap(), None);
    }

    #[test]
    fn both_bounds_kept() {
        let args = WindowArgs {
            start: Some(at(1)),
            end: Some(at(15)),
        };
        assert_eq!(
            window(&args, 1).unwrap(),
            Some(TimeWindow::new(at(1), at(15)))
        );
    }

    #[test]
    fn single_bound_is_completed() {
        let args = WindowArgs {
            start: Some(at(1)),
            end: None,
        };
        let window = window(&args, 100).unwrap().unwrap();
        assert_eq!(window.start, at(1));
        assert!(window.end > Utc::now());
    }

    #[test]
    fn inverted_bounds_rejected() {
        let args = WindowArgs {
            start: Some(at(15)),
            end: Some(at(1)),
        };
        assert!(matches!(window(&args, 1), Err(CliError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn get_missing_event_is_not_found() {
        let transport = CannedTransport::with(&[(404, "")]);
        let err = get(&account(transport), "/cal/home/", "/cal/home/gone.ics")
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::CalDav(ref e) if e.code() == CalDavErrorCode::NotFound));
    }

    #[tokio::test]
    async fn raw_report_passes_body_through() {
        let transport = CannedTransport::with(&[(207, "<d:multistatus/>")]);
        let body = raw_report(&account(transport.clone()), "/cal/home/", &WindowArgs::default())
            .await
            .unwrap();
        assert_eq!(body, "<d:multistatus/>");
        assert_eq!(transport.requests()[0].url.path(), "/cal/home/");
    }
}
