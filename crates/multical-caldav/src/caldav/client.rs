//! WebDAV request layer.
//!
//! [`DavClient`] resolves hrefs, sends PROPFIND/REPORT/GET/PUT/DELETE through
//! a [`Transport`] and turns statuses into typed errors. PROPFIND and REPORT
//! answers are parsed into an [`XmlElement`] tree unless the raw body is
//! requested.

use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use super::config::ServerFlavor;
use super::dialect::ResponseDialect;
use super::transport::{DavMethod, DavRequest, DavResponse, Transport};
use super::xml::{Prefixes, XmlElement, parse_document};
use crate::error::{CalDavError, CalDavResult};

/// Client for one DAV server, bound to a server flavor.
#[derive(Clone)]
pub struct DavClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
    flavor: ServerFlavor,
}

impl DavClient {
    pub fn new(transport: Arc<dyn Transport>, base_url: Url, flavor: ServerFlavor) -> Self {
        Self {
            transport,
            base_url,
            flavor,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn flavor(&self) -> ServerFlavor {
        self.flavor
    }

    pub fn prefixes(&self) -> Prefixes {
        self.flavor.prefixes()
    }

    pub fn dialect(&self) -> &'static dyn ResponseDialect {
        self.flavor.dialect()
    }

    /// Resolves an href (path or absolute URL) against the server root.
    pub fn resolve(&self, href: &str) -> CalDavResult<Url> {
        join(&self.base_url, href)
    }

    /// PROPFIND with `Depth: 1`.
    pub async fn propfind(&self, url: &Url, body: String) -> CalDavResult<XmlElement> {
        let request = DavRequest::new(DavMethod::Propfind, url.clone())
            .with_depth(1)
            .with_xml_body(body);
        let response = self.send_checked(request).await?;
        parse_multistatus(url, &response)
    }

    /// REPORT with `Depth: 1`.
    pub async fn report(&self, url: &Url, body: String) -> CalDavResult<XmlElement> {
        let response = self.report_response(url, body).await?;
        parse_multistatus(url, &response)
    }

    /// REPORT returning the body unparsed.
    pub async fn report_raw(&self, url: &Url, body: String) -> CalDavResult<String> {
        Ok(self.report_response(url, body).await?.body)
    }

    pub async fn get(&self, url: &Url) -> CalDavResult<String> {
        let request = DavRequest::new(DavMethod::Get, url.clone());
        Ok(self.send_checked(request).await?.body)
    }

    /// PUT an iCalendar body; returns the status whatever it is.
    pub async fn put(
        &self,
        url: &Url,
        body: String,
        headers: &[(&str, &str)],
    ) -> CalDavResult<u16> {
        let mut request = DavRequest::new(DavMethod::Put, url.clone());
        for (name, value) in headers {
            request = request.with_header(*name, *value);
        }
        let response = self.transport.send(request.with_calendar_body(body)).await?;
        debug!(url = %url, status = response.status, "PUT finished");
        Ok(response.status)
    }

    /// DELETE; returns the status whatever it is.
    pub async fn delete(&self, url: &Url) -> CalDavResult<u16> {
        let request = DavRequest::new(DavMethod::Delete, url.clone());
        let response = self.transport.send(request).await?;
        debug!(url = %url, status = response.status, "DELETE finished");
        Ok(response.status)
    }

    async fn report_response(&self, url: &Url, body: String) -> CalDavResult<DavResponse> {
        let request = DavRequest::new(DavMethod::Report, url.clone())
            .with_depth(1)
            .with_xml_body(body);
        self.send_checked(request).await
    }

    async fn send_checked(&self, request: DavRequest) -> CalDavResult<DavResponse> {
        let method = request.method;
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        check_status(method, &url, response)
    }
}

/// Joins an href onto a base URL; absolute hrefs replace it.
pub fn join(base: &Url, href: &str) -> CalDavResult<Url> {
    base.join(href).map_err(|e| {
        CalDavError::protocol(format!("invalid href '{href}' relative to {base}")).with_source(e)
    })
}

/// Maps non-2xx statuses to typed errors.
pub fn check_status(method: DavMethod, url: &Url, response: DavResponse) -> CalDavResult<DavResponse> {
    if response.is_success() {
        return Ok(response);
    }
    Err(status_error(method, url, response.status))
}

/// Typed error for a failed `method` on `url`.
pub fn status_error(method: DavMethod, url: &Url, status: u16) -> CalDavError {
    let err = match status {
        401 => CalDavError::authentication(format!("{method} {url}: credentials rejected")),
        403 => CalDavError::authorization(format!("{method} {url}: access denied")),
        404 => CalDavError::not_found(format!("{method} {url}: no such resource")),
        s if s >= 500 => CalDavError::server(format!("{method} {url} failed")),
        _ => {
            warn!(method = %method, url = %url, status, "Unexpected response status");
            CalDavError::protocol(format!("{method} {url}: unexpected status"))
        }
    };
    err.with_status(status)
}

fn parse_multistatus(url: &Url, response: &DavResponse) -> CalDavResult<XmlElement> {
    parse_document(&response.body).map_err(|e| {
        warn!(url = %url, status = response.status, "Unparseable XML response");
        e.with_status(response.status)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caldav::testing::ScriptedTransport;
    use crate::error::CalDavErrorCode;

    fn client(transport: &Arc<ScriptedTransport>) -> DavClient {
        DavClient::new(
            transport.clone(),
            Url::parse("https://dav.example.com/").unwrap(),
            ServerFlavor::Standard,
        )
    }

    #[test]
    fn join_handles_paths_and_absolute_urls() {
        let base = Url::parse("https://dav.example.com/").unwrap();
        assert_eq!(
            join(&base, "/cal/a.ics").unwrap().as_str(),
            "https://dav.example.com/cal/a.ics"
        );
        assert_eq!(
            join(&base, "https://p42-caldav.icloud.com/123/calendars/")
                .unwrap()
                .host_str(),
            Some("p42-caldav.icloud.com")
        );
    }

    #[test]
    fn status_mapping() {
        let url = Url::parse("https://dav.example.com/x").unwrap();
        let code = |status| {
            check_status(DavMethod::Propfind, &url, DavResponse::new(status, ""))
                .unwrap_err()
                .code()
        };
        assert_eq!(code(401), CalDavErrorCode::Authentication);
        assert_eq!(code(403), CalDavErrorCode::Authorization);
        assert_eq!(code(404), CalDavErrorCode::NotFound);
        assert_eq!(code(502), CalDavErrorCode::Server);
        assert_eq!(code(409), CalDavErrorCode::Protocol);
        assert!(check_status(DavMethod::Report, &url, DavResponse::new(207, "")).is_ok());
    }

    #[tokio::test]
    async fn propfind_sends_depth_and_parses() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(207, r#"<D:multistatus xmlns:D="DAV:"/>"#);
        let dav = client(&transport);

        let url = dav.resolve("/").unwrap();
        let root = dav.propfind(&url, "<D:propfind/>".into()).await.unwrap();
        assert_eq!(root.name, "multistatus");

        let requests = transport.requests();
        assert_eq!(requests[0].method, DavMethod::Propfind);
        assert_eq!(requests[0].header("Depth"), Some("1"));
    }

    #[tokio::test]
    async fn malformed_xml_on_success_is_protocol_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(207, "<html><body>oops");
        let dav = client(&transport);

        let url = dav.resolve("/cal/").unwrap();
        let err = dav.report(&url, String::new()).await.unwrap_err();
        assert_eq!(err.code(), CalDavErrorCode::Protocol);
        assert_eq!(err.status(), Some(207));
    }

    #[tokio::test]
    async fn raw_report_skips_parsing() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(207, "not xml at all");
        let dav = client(&transport);

        let url = dav.resolve("/cal/").unwrap();
        assert_eq!(dav.report_raw(&url, String::new()).await.unwrap(), "not xml at all");
    }

    #[tokio::test]
    async fn put_and_delete_return_status() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(412, "");
        transport.push(204, "");
        let dav = client(&transport);

        let url = dav.resolve("/cal/a.ics").unwrap();
        assert_eq!(dav.put(&url, "BEGIN:VCALENDAR".into(), &[("If-Match", "*")]).await.unwrap(), 412);
        assert_eq!(dav.delete(&url).await.unwrap(), 204);

        let requests = transport.requests();
        assert_eq!(requests[0].header("If-Match"), Some("*"));
        assert_eq!(requests[1].method, DavMethod::Delete);
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_error(CalDavError::transport("connection reset"));
        let dav = client(&transport);

        let url = dav.resolve("/cal/").unwrap();
        let err = dav.get(&url).await.unwrap_err();
        assert_eq!(err.code(), CalDavErrorCode::Transport);
    }
}
