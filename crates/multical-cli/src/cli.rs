//! Command-line interface definition.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use multical_core::EventDraft;

/// multical - CalDAV calendars from the command line
#[derive(Debug, Parser)]
#[command(name = "multical")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "MULTICAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Print compact JSON instead of indented JSON
    #[arg(long)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the account's event calendars
    Calendars,

    /// List events of one or more calendars
    Events {
        /// Calendar id (path); can be repeated
        #[arg(long = "calendar", required = true)]
        calendars: Vec<String>,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Fetch a single stored event
    Get {
        /// Calendar id (path)
        #[arg(long)]
        calendar: String,

        /// Event resource href
        #[arg(long)]
        url: String,
    },

    /// Create an event
    Create {
        /// Calendar id (path)
        #[arg(long)]
        calendar: String,

        #[command(flatten)]
        event: EventArgs,
    },

    /// Replace a stored event
    Update {
        /// Calendar id (path)
        #[arg(long)]
        calendar: String,

        /// Event resource href
        #[arg(long)]
        url: String,

        /// UID to keep; derived from the href when omitted
        #[arg(long)]
        uid: Option<String>,

        #[command(flatten)]
        event: EventArgs,
    },

    /// Delete a stored event
    Delete {
        /// Calendar id (path)
        #[arg(long)]
        calendar: String,

        /// Event resource href
        #[arg(long)]
        url: String,
    },

    /// Check that the configured credentials work
    Check,

    /// Print the raw calendar-query response of a calendar
    RawReport {
        /// Calendar id (path)
        #[arg(long)]
        calendar: String,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Optional query window bounds (RFC 3339).
#[derive(Debug, Clone, Default, Args)]
pub struct WindowArgs {
    /// Window start, e.g. 2024-03-01T00:00:00Z
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    /// Window end (exclusive)
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,
}

/// Fields of an event to write.
#[derive(Debug, Clone, Args)]
pub struct EventArgs {
    /// Start instant (RFC 3339)
    #[arg(long)]
    pub start: DateTime<Utc>,

    /// End instant (RFC 3339)
    #[arg(long)]
    pub end: DateTime<Utc>,

    #[arg(long, default_value = "")]
    pub summary: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long, default_value = "")]
    pub location: String,

    /// Attendee email; can be repeated
    #[arg(long = "attendee")]
    pub attendees: Vec<String>,

    /// Write date-only start and end
    #[arg(long)]
    pub all_day: bool,

    /// IANA zone for start (and end, unless --end-timezone is given)
    #[arg(long)]
    pub timezone: Option<String>,

    /// IANA zone for end
    #[arg(long)]
    pub end_timezone: Option<String>,
}

impl EventArgs {
    /// Builds the draft handed to the account.
    pub fn to_draft(&self, uid: Option<&str>) -> EventDraft {
        let mut draft = EventDraft::new(self.start, self.end)
            .with_summary(&self.summary)
            .with_description(&self.description)
            .with_location(&self.location);
        draft.attendees = self.attendees.clone();
        draft.start_timezone = self.timezone.clone();
        draft.end_timezone = self.end_timezone.clone();
        if self.all_day {
            draft = draft.all_day();
        }
        if let Some(uid) = uid {
            draft = draft.with_event_id(uid);
        }
        draft
    }
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
