//! multical CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use multical_caldav::CalDavAccount;
use multical_core::{TracingConfig, init_tracing};

use multical_cli::cli::{Cli, Command, ConfigAction};
use multical_cli::commands::{self, Output};
use multical_cli::config::CliConfig;
use multical_cli::error::CliResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CliConfig::load_from(path),
        None => CliConfig::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let logging = if cli.debug || config.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(logging) {
        eprintln!("warning: {e}");
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: CliConfig) -> CliResult<()> {
    let output = Output::new(config.display.pretty && !cli.compact);

    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Validate => {
                let server = commands::config::validate(&config)?;
                println!("Configuration is valid ({server}).");
                Ok(())
            }
            ConfigAction::Path => {
                let path = commands::config::path(cli.config.as_deref());
                println!("config: {}", path.display());
                Ok(())
            }
        };
    }

    let account = CalDavAccount::new(config.account()?.to_caldav_config()?);

    match cli.command {
        Command::Calendars => output.print(&commands::calendars::calendars(&account).await?),
        Command::Check => output.print(&commands::calendars::check(&account).await),
        Command::Events { calendars, window } => {
            output.print(&commands::events::events(&account, &calendars, &window).await?)
        }
        Command::Get { calendar, url } => {
            output.print(&commands::events::get(&account, &calendar, &url).await?)
        }
        Command::RawReport { calendar, window } => {
            println!(
                "{}",
                commands::events::raw_report(&account, &calendar, &window).await?
            );
            Ok(())
        }
        Command::Create { calendar, event } => {
            output.print(&commands::write::create(&account, &calendar, &event).await?)
        }
        Command::Update {
            calendar,
            url,
            uid,
            event,
        } => output.print(
            &commands::write::update(&account, &calendar, &url, uid.as_deref(), &event).await?,
        ),
        Command::Delete { calendar, url } => {
            output.print(&commands::write::delete(&account, &calendar, &url).await?)
        }
        Command::Config { .. } => Ok(()),
    }
}
