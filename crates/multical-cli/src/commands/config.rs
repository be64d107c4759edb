//! Configuration commands.

use std::path::{Path, PathBuf};

use crate::config::CliConfig;
use crate::error::CliResult;

/// Checks that the account section resolves into a usable adapter config.
///
/// Returns the server URL that would be contacted.
pub fn validate(config: &CliConfig) -> CliResult<String> {
    let caldav = config.account()?.to_caldav_config()?;
    Ok(caldav.url_str().to_string())
}

/// The file that is (or would be) loaded.
pub fn path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(CliConfig::default_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    #[test]
    fn validate_reports_server() {
        let config: CliConfig = toml::from_str(
            "[account]\nserver = \"https://dav.example.com/\"\nusername = \"a\"\npassword = \"b\"\n",
        )
        .unwrap();
        assert_eq!(validate(&config).unwrap(), "https://dav.example.com/");
    }

    #[test]
    fn validate_without_account_fails() {
        assert!(matches!(
            validate(&CliConfig::default()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn explicit_path_wins() {
        assert_eq!(path(Some(Path::new("/tmp/x.toml"))), PathBuf::from("/tmp/x.toml"));
        assert_eq!(path(None), CliConfig::default_path());
    }
}
