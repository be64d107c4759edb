//! Command-line front end for CalDAV accounts.
//!
//! This crate provides the `multical` binary. Every command prints JSON.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use error::{CliError, CliResult};
