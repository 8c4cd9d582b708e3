// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::TaskKind;

/// Used when `[main].max_concurrent_tasks` is omitted.
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 4;

/// Used when `[main].default_timeout` is omitted.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Requirement marker meaning "this task has no requirements".
pub const NO_REQUIREMENTS: &str = "none";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [main]
/// max_concurrent_tasks = 2
/// default_timeout = 30
///
/// [[task]]
/// name = "build"
/// type = "EXEC"
/// exec_command = "make all"
/// requires = ["none"]
///
/// [[task]]
/// name = "cooldown"
/// type = "SLEEP"
/// sleep_duration = 3
/// requires = ["build"]
/// timeout = 10
/// ```
///
/// This is only the *shape* of the file. Use
/// [`crate::config::load_and_validate`] to obtain an [`ExecutionConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Global settings from `[main]`.
    #[serde(default)]
    pub main: MainSection,

    /// Tasks from `[[task]]`, in file order.
    #[serde(default)]
    pub task: Vec<TaskSection>,
}

/// `[main]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MainSection {
    /// Upper bound on simultaneously running workers.
    #[serde(default)]
    pub max_concurrent_tasks: Option<usize>,

    /// Upper bound on any task timeout, in seconds. `0` disables timeouts.
    #[serde(default)]
    pub default_timeout: Option<u64>,
}

/// One `[[task]]` entry, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSection {
    pub name: Option<String>,

    /// Names of tasks that must succeed first, or `["none"]`.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Timeout in seconds; `0` or anything above `default_timeout` falls
    /// back to `default_timeout`.
    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(rename = "type", default)]
    pub kind: Option<TaskKind>,

    /// Seconds to sleep (`SLEEP` tasks).
    #[serde(default)]
    pub sleep_duration: Option<u64>,

    /// Command line (`EXEC` tasks).
    #[serde(default)]
    pub exec_command: Option<ExecCommand>,
}

/// `exec_command` may be written as one string or as a list of words.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExecCommand {
    Line(String),
    Words(Vec<String>),
}

impl ExecCommand {
    /// The command as a single shell line; words are joined with spaces.
    pub fn to_line(&self) -> String {
        match self {
            ExecCommand::Line(line) => line.trim().to_string(),
            ExecCommand::Words(words) => words.join(" ").trim().to_string(),
        }
    }
}

/// What a worker does for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Sleep { seconds: u64 },
    Exec { command: String },
}

/// A validated task. Read-only for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConfig {
    pub name: String,
    /// Requirement names as written (possibly the `"none"` marker); they are
    /// resolved against the other tasks by [`crate::dag::TaskGraph::build`].
    pub requirements: Vec<String>,
    pub directive: Directive,
    /// Effective timeout in seconds after clamping; `0` means unlimited.
    pub timeout_secs: u64,
    /// Destination for the worker's captured output.
    pub log_path: PathBuf,
}

impl TaskConfig {
    /// Effective timeout, or `None` when the task may run forever.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

/// Validated configuration: what the scheduler consumes.
///
/// Construct via [`crate::config::load_and_validate`] or
/// [`RawConfigFile::into_execution_config`]; task names are not yet known
/// to be unique and requirements are not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    pub max_concurrent_tasks: usize,
    pub default_timeout_secs: u64,
    pub tasks: Vec<TaskConfig>,
}

impl ExecutionConfig {
    /// Bypass validation. Intended for tests and builders.
    pub fn new_unchecked(
        max_concurrent_tasks: usize,
        default_timeout_secs: u64,
        tasks: Vec<TaskConfig>,
    ) -> Self {
        Self {
            max_concurrent_tasks,
            default_timeout_secs,
            tasks,
        }
    }

    pub fn num_tasks(&self) -> usize {
        self.tasks.len()
    }
}
