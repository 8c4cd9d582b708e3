// src/types.rs

use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

/// The `type` field of a `[[task]]` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskKind {
    /// Sleep for `sleep_duration` seconds.
    Sleep,
    /// Run `exec_command` through the shell.
    Exec,
}

/// How task statuses are rendered while the master runs.
///
/// - `Table`: one colour-coded line per task on stderr, redrawn periodically.
/// - `None`: no rendering at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPERCASE")]
pub enum VerbosityType {
    Table,
    None,
}

impl Default for VerbosityType {
    fn default() -> Self {
        VerbosityType::Table
    }
}

impl FromStr for VerbosityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TABLE" => Ok(VerbosityType::Table),
            "NONE" => Ok(VerbosityType::None),
            other => Err(format!(
                "unknown verbosity type: {other} (expected \"TABLE\" or \"NONE\")"
            )),
        }
    }
}
