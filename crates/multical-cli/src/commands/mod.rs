//! Subcommand implementations.
//!
//! Each command returns a serializable value; [`Output`] renders it as JSON.

pub mod calendars;
pub mod config;
pub mod events;
pub mod write;

use serde::Serialize;

use crate::error::CliResult;

/// JSON renderer for command results.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pretty: bool,
}

impl Output {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn render<T: Serialize + ?Sized>(&self, value: &T) -> CliResult<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(text)
    }

    pub fn print<T: Serialize + ?Sized>(&self, value: &T) -> CliResult<()> {
        println!("{}", self.render(value)?);
        Ok(())
    }
}
