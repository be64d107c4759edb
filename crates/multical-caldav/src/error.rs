//! Error types for CalDAV account operations.
//!
//! Every fallible operation in this crate returns [`CalDavResult`]. The
//! [`CalDavErrorCode`] tells callers which class of failure happened, so a
//! missing event can be told apart from a failed request.

use std::fmt;
use thiserror::Error;

/// The category of a CalDAV error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalDavErrorCode {
    /// Connection, TLS, DNS or timeout failure.
    Transport,
    /// The server rejected the credentials (401).
    Authentication,
    /// The account lacks permission for the resource (403).
    Authorization,
    /// Malformed XML or a response missing a required element.
    Protocol,
    /// Precondition failure on create that outlived the retry budget.
    Conflict,
    /// The requested event or calendar does not exist.
    NotFound,
    /// The server answered with a 5xx status.
    Server,
    /// Invalid client configuration.
    Configuration,
    /// Caller-supplied fields cannot be encoded.
    InvalidInput,
    /// Unexpected internal state.
    Internal,
}

impl CalDavErrorCode {
    /// Returns true if a later attempt might succeed.
    ///
    /// Advisory only: nothing in this crate retries on these codes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport | Self::Server)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport_error",
            Self::Authentication => "authentication_failed",
            Self::Authorization => "authorization_failed",
            Self::Protocol => "protocol_error",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Server => "server_error",
            Self::Configuration => "configuration_error",
            Self::InvalidInput => "invalid_input",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for CalDavErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised while talking to a CalDAV server.
#[derive(Debug, Error)]
pub struct CalDavError {
    code: CalDavErrorCode,
    message: String,
    /// HTTP status that triggered the error, when there was one.
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CalDavError {
    pub fn new(code: CalDavErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(CalDavErrorCode::Transport, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(CalDavErrorCode::Authentication, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(CalDavErrorCode::Authorization, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(CalDavErrorCode::Protocol, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(CalDavErrorCode::Conflict, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(CalDavErrorCode::NotFound, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(CalDavErrorCode::Server, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(CalDavErrorCode::Configuration, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(CalDavErrorCode::InvalidInput, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CalDavErrorCode::Internal, message)
    }

    /// Records the HTTP status that caused this error.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> CalDavErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_not_found(&self) -> bool {
        self.code == CalDavErrorCode::NotFound
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for CalDavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {status})")?;
        }
        Ok(())
    }
}

pub type CalDavResult<T> = Result<T, CalDavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_codes() {
        assert!(CalDavErrorCode::Transport.is_retryable());
        assert!(CalDavErrorCode::Server.is_retryable());
        assert!(!CalDavErrorCode::Conflict.is_retryable());
        assert!(!CalDavErrorCode::Protocol.is_retryable());
        assert!(!CalDavErrorCode::NotFound.is_retryable());
    }

    #[test]
    fn display_includes_status() {
        let err = CalDavError::server("calendar-query failed").with_status(503);
        assert_eq!(
            err.to_string(),
            "server_error: calendar-query failed (HTTP 503)"
        );
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn not_found_is_distinct() {
        let err = CalDavError::not_found("no event at /cal/x.ics");
        assert!(err.is_not_found());
        assert!(!CalDavError::transport("reset").is_not_found());
    }

    #[test]
    fn keeps_source() {
        use std::error::Error;
        let err = CalDavError::transport("connect failed")
            .with_source(std::io::Error::other("refused"));
        assert!(err.source().is_some());
    }
}
