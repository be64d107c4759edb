//! CLI error types.

use multical_caldav::CalDavError;
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file or account settings are unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Command-line values that parse but make no sense together.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    CalDav(#[from] CalDavError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}
