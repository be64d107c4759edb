//! CalDAV account configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::dialect::{NamespacedDialect, ResponseDialect, TagNameDialect};
use super::xml::Prefixes;
use crate::error::{CalDavError, CalDavResult};

/// Which family of server the account talks to.
///
/// Fixes both the request prefixes and how multistatus responses are read.
/// Never sniffed from responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerFlavor {
    /// Namespace-qualified `D:`/`C:` traversal.
    #[default]
    Standard,
    /// iCloud: `d:`/`c:` prefixes, responses matched by tag name only.
    #[serde(rename = "icloud")]
    ICloud,
}

static NAMESPACED: NamespacedDialect = NamespacedDialect;
static TAG_NAME: TagNameDialect = TagNameDialect;

impl ServerFlavor {
    pub fn prefixes(self) -> Prefixes {
        match self {
            Self::Standard => Prefixes::STANDARD,
            Self::ICloud => Prefixes::ICLOUD,
        }
    }

    pub fn dialect(self) -> &'static dyn ResponseDialect {
        match self {
            Self::Standard => &NAMESPACED,
            Self::ICloud => &TAG_NAME,
        }
    }
}

impl fmt::Display for ServerFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::ICloud => f.write_str("icloud"),
        }
    }
}

/// Configuration for one CalDAV account.
#[derive(Clone)]
pub struct CalDavConfig {
    /// Server root; principal discovery starts at its path.
    pub url: Url,
    pub username: String,
    pub password: String,
    pub flavor: ServerFlavor,
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
    /// Per-request timeout.
    pub timeout: Duration,
    pub user_agent: String,
    /// Span on each side of "now" used when listing without a window.
    pub default_span_years: u32,
    /// Maximum number of PUT attempts when creating an event.
    pub create_attempts: u32,
    /// Address treated as "self" when writing attendees.
    pub email: Option<String>,
}

impl CalDavConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_SPAN_YEARS: u32 = 100;
    pub const DEFAULT_CREATE_ATTEMPTS: u32 = 10;
    pub const ICLOUD_URL: &'static str = "https://p01-caldav.icloud.com/";

    /// Creates a configuration for a standard CalDAV server.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL does not parse or is not an
    /// http(s) URL with a host.
    pub fn new(
        url: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> CalDavResult<Self> {
        let url = url.as_ref();
        let parsed = Url::parse(url).map_err(|e| {
            CalDavError::configuration(format!("invalid server URL '{url}'")).with_source(e)
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(CalDavError::configuration(format!(
                "server URL must be http(s) with a host, got '{url}'"
            )));
        }

        Ok(Self {
            url: parsed,
            username: username.into(),
            password: password.into(),
            flavor: ServerFlavor::Standard,
            verify_tls: true,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("multical/{}", env!("CARGO_PKG_VERSION")),
            default_span_years: Self::DEFAULT_SPAN_YEARS,
            create_attempts: Self::DEFAULT_CREATE_ATTEMPTS,
            email: None,
        })
    }

    /// Preset for iCloud accounts.
    pub fn icloud(username: impl Into<String>, password: impl Into<String>) -> CalDavResult<Self> {
        Ok(Self::new(Self::ICLOUD_URL, username, password)?.with_flavor(ServerFlavor::ICloud))
    }

    pub fn with_flavor(mut self, flavor: ServerFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Development mode: skips certificate verification.
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_default_span_years(mut self, years: u32) -> Self {
        self.default_span_years = years;
        self
    }

    /// Sets the create attempt budget; zero is raised to one.
    pub fn with_create_attempts(mut self, attempts: u32) -> Self {
        self.create_attempts = attempts.max(1);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// The account's own address: the email override, or the username.
    pub fn account_email(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.username)
    }

    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Debug for CalDavConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalDavConfig")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("flavor", &self.flavor)
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("default_span_years", &self.default_span_years)
            .field("create_attempts", &self.create_attempts)
            .field("email", &self.email)
            .finish()
    }
}
