//! In-memory transport for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::transport::{DavRequest, DavResponse, Transport};
use crate::account::BoxFuture;
use crate::error::{CalDavError, CalDavResult};

/// Replays queued responses in order and records every request.
///
/// Running out of responses is a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<CalDavResult<DavResponse>>>,
    requests: Mutex<Vec<DavRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, status: u16, body: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(DavResponse::new(status, body)));
    }

    pub fn push_error(&self, error: CalDavError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<DavRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose body contains `needle`.
    pub fn count_bodies_containing(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.body.as_deref().is_some_and(|b| b.contains(needle)))
            .count()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: DavRequest) -> BoxFuture<'_, CalDavResult<DavResponse>> {
        let description = format!("{} {}", request.method, request.url);
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        Box::pin(async move {
            next.unwrap_or_else(|| {
                Err(CalDavError::transport(format!(
                    "no scripted response for {description}"
                )))
            })
        })
    }
}

/// Wraps `responses` into a multistatus document.
pub fn multistatus(responses: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">{responses}</D:multistatus>"#
    )
}

/// A `response` carrying `calendar-data` for `href`.
pub fn calendar_data_response(href: &str, ics: &str) -> String {
    format!(
        r#"<D:response><D:href>{href}</D:href><D:propstat><D:prop><D:getetag>"1"</D:getetag><C:calendar-data><![CDATA[{ics}]]></C:calendar-data></D:prop><D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>"#
    )
}

/// A calendar-query `response` listing `href` with an etag only.
pub fn etag_response(href: &str) -> String {
    format!(
        r#"<D:response><D:href>{href}</D:href><D:propstat><D:prop><D:getetag>"1"</D:getetag></D:prop><D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>"#
    )
}
