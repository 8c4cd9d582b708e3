// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::VerbosityType;

/// Command-line arguments for `dagmaster`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagmaster",
    version,
    about = "Run a DAG of shell and sleep tasks as worker processes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: PathBuf,

    /// Directory receiving one `<task>.log` file per task. Created if missing.
    #[arg(short = 'l', long = "log", value_name = "DIR")]
    pub log_dir: PathBuf,

    /// How task statuses are shown while running.
    #[arg(
        short = 'v',
        long,
        value_enum,
        value_name = "TYPE",
        default_value_t = VerbosityType::Table,
        ignore_case = true
    )]
    pub verbosity_type: VerbosityType,

    /// Seconds between two redraws of the status table.
    #[arg(
        short = 's',
        long,
        value_name = "SECS",
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sleep_duration: u64,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGMASTER_LOG` or `warn` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load, validate and resolve the plan, print it, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
