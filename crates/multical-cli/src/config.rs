//! CLI configuration.
//!
//! Settings live in `~/.config/multical/config.toml` by default:
//!
//! ```toml
//! [account]
//! server = "https://dav.example.com/"
//! username = "alice@example.com"
//! password = "pass::caldav/alice"
//! flavor = "standard"          # or "icloud"; server may be omitted for icloud
//! development = false          # skip TLS verification
//! timeout_secs = 30
//!
//! [display]
//! pretty = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use multical_caldav::{CalDavConfig, ServerFlavor};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};
use crate::secret;

/// Configuration for the multical CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// The CalDAV account to talk to.
    pub account: Option<AccountSettings>,

    /// Debug logging.
    pub debug: bool,

    pub display: DisplaySettings,
}

/// `[account]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSettings {
    /// Server root URL. Optional for iCloud accounts.
    pub server: Option<String>,

    pub username: String,

    /// Password; supports `pass::` and `env::` references.
    pub password: String,

    #[serde(default)]
    pub flavor: ServerFlavor,

    /// Development mode: TLS certificates are not verified.
    #[serde(default)]
    pub development: bool,

    pub timeout_secs: Option<u64>,

    /// Address treated as the account owner when writing attendees.
    /// Defaults to the username.
    pub email: Option<String>,
}

/// `[display]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Indent JSON output.
    pub pretty: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl CliConfig {
    /// Loads the default file, or defaults when it does not exist.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("multical")
    }

    /// The `[account]` section, or an error explaining how to add one.
    pub fn account(&self) -> CliResult<&AccountSettings> {
        self.account.as_ref().ok_or_else(|| {
            CliError::Config(format!(
                "no account configured. Add to {}:\n  \
                 [account]\n  \
                 server = \"https://dav.example.com/\"\n  \
                 username = \"you@example.com\"\n  \
                 password = \"env::MULTICAL_PASSWORD\"",
                Self::default_path().display()
            ))
        })
    }
}

impl AccountSettings {
    /// Builds the adapter configuration, resolving the password reference.
    pub fn to_caldav_config(&self) -> CliResult<CalDavConfig> {
        let password = secret::resolve(&self.password)?;

        let mut config = match (self.server.as_deref(), self.flavor) {
            (Some(server), flavor) => {
                CalDavConfig::new(server, &self.username, password)?.with_flavor(flavor)
            }
            (None, ServerFlavor::ICloud) => CalDavConfig::icloud(&self.username, password)?,
            (None, ServerFlavor::Standard) => {
                return Err(CliError::Config(
                    "[account] server is required unless flavor = \"icloud\"".to_string(),
                ));
            }
        };

        if self.development {
            config = config.with_insecure_tls();
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(email) = &self.email {
            config = config.with_email(email);
        }
        Ok(config)
    }
}
