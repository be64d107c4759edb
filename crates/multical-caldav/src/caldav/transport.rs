//! Authenticated HTTP(S) channel for WebDAV verbs.
//!
//! The [`Transport`] trait is the seam between protocol logic and the network:
//! [`HttpTransport`] talks to real servers through a per-`host:port`
//! [`ConnectionPool`], tests substitute a scripted implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method};
use tokio::sync::Mutex;
use tracing::{debug, trace};
use url::Url;

use super::auth::Credentials;
use super::config::CalDavConfig;
use crate::account::BoxFuture;
use crate::error::{CalDavError, CalDavResult};

/// Content type for XML request bodies.
pub const XML_CONTENT_TYPE: &str = "text/xml; charset=\"UTF-8\"";
/// Content type for iCalendar PUT bodies.
pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// The verbs this crate sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DavMethod {
    Get,
    Propfind,
    Report,
    Put,
    Delete,
}

impl DavMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Propfind => "PROPFIND",
            Self::Report => "REPORT",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> CalDavResult<Method> {
        Method::from_bytes(self.as_str().as_bytes()).map_err(|e| {
            CalDavError::internal(format!("invalid HTTP method {}", self.as_str())).with_source(e)
        })
    }
}

impl fmt::Display for DavMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavRequest {
    pub method: DavMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl DavRequest {
    pub fn new(method: DavMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_depth(self, depth: u8) -> Self {
        self.with_header("Depth", depth.to_string())
    }

    pub fn with_xml_body(self, body: impl Into<String>) -> Self {
        let mut request = self.with_header("Content-Type", XML_CONTENT_TYPE);
        request.body = Some(body.into());
        request
    }

    pub fn with_calendar_body(self, body: impl Into<String>) -> Self {
        let mut request = self.with_header("Content-Type", CALENDAR_CONTENT_TYPE);
        request.body = Some(body.into());
        request
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Pool key for this request's destination.
    pub fn connection_key(&self) -> String {
        connection_key(&self.url)
    }
}

/// `host:port`, with the scheme's default port when none is given.
pub fn connection_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port_or_known_default() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Status and body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResponse {
    pub status: u16,
    pub body: String,
}

impl DavResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to a DAV server.
///
/// Implementations return every HTTP status as a response; only failures to
/// exchange a request at all are errors.
pub trait Transport: Send + Sync {
    fn send(&self, request: DavRequest) -> BoxFuture<'_, CalDavResult<DavResponse>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: DavRequest) -> BoxFuture<'_, CalDavResult<DavResponse>> {
        (**self).send(request)
    }
}

/// HTTP clients keyed by `host:port`, created on first use.
///
/// Clients are kept for the pool's lifetime and never closed explicitly.
pub struct ConnectionPool {
    verify_tls: bool,
    timeout: Duration,
    user_agent: String,
    clients: Mutex<HashMap<String, Client>>,
}

impl ConnectionPool {
    pub fn new(config: &CalDavConfig) -> Self {
        Self {
            verify_tls: config.verify_tls,
            timeout: config.timeout,
            user_agent: config.user_agent.clone(),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the client for `key`, building it if needed.
    pub async fn client_for(&self, key: &str) -> CalDavResult<Client> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(key) {
            return Ok(client.clone());
        }

        debug!(key = %key, verify_tls = self.verify_tls, "Opening connection");
        let client = Client::builder()
            .danger_accept_invalid_certs(!self.verify_tls)
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| CalDavError::transport("failed to create HTTP client").with_source(e))?;
        clients.insert(key.to_string(), client.clone());
        Ok(client)
    }

    /// Number of open destinations.
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// reqwest-backed transport with Basic authentication on every request.
pub struct HttpTransport {
    pool: ConnectionPool,
    credentials: Credentials,
}

impl HttpTransport {
    pub fn new(config: &CalDavConfig) -> Self {
        Self {
            pool: ConnectionPool::new(config),
            credentials: Credentials::new(&config.username, &config.password),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    async fn execute(&self, request: DavRequest) -> CalDavResult<DavResponse> {
        let client = self.pool.client_for(&request.connection_key()).await?;
        let method = request.method.to_reqwest()?;

        let mut builder = client
            .request(method, request.url.clone())
            .header("Authorization", self.credentials.basic_header())
            .header("Connection", "keep-alive");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        trace!(method = %request.method, url = %request.url, "Sending request");
        let response = builder.send().await.map_err(|e| {
            CalDavError::transport(format!("{} {} failed", request.method, request.url))
                .with_source(e)
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            CalDavError::transport("failed to read response body")
                .with_status(status)
                .with_source(e)
        })?;
        debug!(
            method = %request.method,
            url = %request.url,
            status,
            bytes = body.len(),
            "Received response"
        );
        Ok(DavResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: DavRequest) -> BoxFuture<'_, CalDavResult<DavResponse>> {
        Box::pin(self.execute(request))
    }
}
