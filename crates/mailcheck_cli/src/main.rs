//! CLI entry point.
//!
//! # Responsibility
//! - `ping`: verify `mailcheck_core` linkage.
//! - `demo`: register one address pair against the configured database.
//! - `seed`: replace table contents with fixed seed rows.
//!
//! Flags override the matching `MAILCHECK_*` environment variables.

use clap::{Args, Parser, Subcommand};
use log::error;
use mailcheck_core::{
    init_logging, AppConfig, AppContext, ConfigSettings, EmailAddressService, RegisterOutcome,
    INTEGRITY_VIOLATION_MESSAGE,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mailcheck_cli")]
#[command(about = "Validated email address storage", version)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Print core linkage and version
    Ping,
    /// Register the sample address pair
    Demo,
    /// Replace every row with the fixed seed rows
    Seed,
}

impl Commands {
    fn name(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Demo => "demo",
            Self::Seed => "seed",
        }
    }
}

#[derive(Args, Debug, Default)]
struct SettingsArgs {
    /// Connection string, e.g. sqlite:///database.db or sqlite://:memory:
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Log level for file logging
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory for rolling log files; file logging is off without it
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

impl From<SettingsArgs> for ConfigSettings {
    fn from(value: SettingsArgs) -> Self {
        Self {
            database_url: value.database_url,
            log_level: value.log_level,
            log_dir: value.log_dir,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command;

    let result = match command {
        Commands::Ping => {
            println!("mailcheck_core ping={}", mailcheck_core::ping());
            println!("mailcheck_core version={}", mailcheck_core::core_version());
            Ok(())
        }
        Commands::Demo => run_demo(cli.settings),
        Commands::Seed => run_seed(cli.settings),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(
                "event=cli_exit module=cli status=error command={} error={err}",
                command.name()
            );
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn open_context(settings: SettingsArgs) -> Result<AppContext, Box<dyn Error>> {
    let config = AppConfig::load(settings.into())?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, log_dir)?;
    }
    Ok(AppContext::open(config)?)
}

fn run_demo(settings: SettingsArgs) -> Result<(), Box<dyn Error>> {
    let mut ctx = open_context(settings)?;
    let outcome = ctx.with_repository(|repo| {
        EmailAddressService::new(repo)
            .register("firstname@student.com", "firstnameBackup@student.com")
    })?;

    match outcome {
        RegisterOutcome::Persisted(address) => {
            println!("stored email address id={}", address.id().unwrap_or_default());
        }
        RegisterOutcome::Blocked { .. } => println!("{INTEGRITY_VIOLATION_MESSAGE}"),
    }
    Ok(())
}

fn run_seed(settings: SettingsArgs) -> Result<(), Box<dyn Error>> {
    let mut ctx = open_context(settings)?;
    let report = ctx.with_repository(|repo| mailcheck_core::seed_email_addresses(repo))?;
    println!(
        "seeded email addresses deleted={} inserted={}",
        report.deleted, report.inserted
    );
    Ok(())
}
