//! Secret references in `config.toml`.
//!
//! A password may name where the secret lives instead of holding it:
//!
//! - `pass::path/in/store` reads the first line of `pass show path/in/store`
//! - `env::VAR_NAME` reads `$VAR_NAME`
//!
//! Anything else is taken literally.

use std::process::Command;

use crate::error::{CliError, CliResult};

/// A parsed secret value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRef<'a> {
    Pass(&'a str),
    Env(&'a str),
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else {
            Self::Plain(value)
        }
    }

    /// Fetches the secret.
    pub fn resolve(self) -> CliResult<String> {
        match self {
            Self::Pass(path) => from_pass(path),
            Self::Env(var) => std::env::var(var).map_err(|_| {
                CliError::Config(format!("environment variable `{var}` is not set"))
            }),
            Self::Plain(value) => Ok(value.to_string()),
        }
    }
}

/// Resolves `value`, following `pass::` and `env::` references.
pub fn resolve(value: &str) -> CliResult<String> {
    SecretRef::parse(value).resolve()
}

fn from_pass(path: &str) -> CliResult<String> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| CliError::Config(format!("failed to run `pass show {path}`: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CliError::Config(format!(
            "`pass show {path}` failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| CliError::Config(format!("`pass show {path}` printed nothing")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixes() {
        assert_eq!(SecretRef::parse("pass::caldav/work"), SecretRef::Pass("caldav/work"));
        assert_eq!(SecretRef::parse("env::DAV_PW"), SecretRef::Env("DAV_PW"));
        assert_eq!(SecretRef::parse("hunter2"), SecretRef::Plain("hunter2"));
        assert_eq!(SecretRef::parse("env:single"), SecretRef::Plain("env:single"));
    }

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(resolve("app-specific-password").unwrap(), "app-specific-password");
        assert_eq!(resolve("").unwrap(), "");
    }

    #[test]
    fn env_reference_resolves() {
        unsafe {
            std::env::set_var("_MULTICAL_TEST_SECRET", "s3cret");
        }
        assert_eq!(resolve("env::_MULTICAL_TEST_SECRET").unwrap(), "s3cret");
        unsafe {
            std::env::remove_var("_MULTICAL_TEST_SECRET");
        }
    }

    #[test]
    fn missing_env_var_is_config_error() {
        let err = resolve("env::_MULTICAL_UNSET_VARIABLE_9876").unwrap_err();
        assert!(matches!(err, CliError::Config(ref msg) if msg.contains("not set")));
    }

    #[test]
    fn unknown_pass_entry_errors() {
        assert!(resolve("pass::multical/does/not/exist/4242").is_err());
    }
}
