// src/config/validate.rs

use std::path::Path;

use crate::config::model::{
    DEFAULT_MAX_CONCURRENT_TASKS, DEFAULT_TIMEOUT_SECS, Directive, ExecutionConfig,
    RawConfigFile, TaskConfig, TaskSection,
};
use crate::errors::{MasterError, Result};
use crate::types::TaskKind;

impl RawConfigFile {
    /// Validate field-level rules and produce an [`ExecutionConfig`].
    ///
    /// Log files are placed in `log_dir` as `<task name>.log`.
    ///
    /// This checks:
    /// - `max_concurrent_tasks >= 1`
    /// - every task has a non-empty `name` without path separators, and a `type`
    /// - `SLEEP` tasks have `sleep_duration` and no `exec_command`
    /// - `EXEC` tasks have a non-empty `exec_command` and no `sleep_duration`
    ///
    /// It does **not** check name uniqueness, requirement names or cycles;
    /// that happens when the dependency graph is built.
    pub fn into_execution_config(self, log_dir: &Path) -> Result<ExecutionConfig> {
        let max_concurrent_tasks = self
            .main
            .max_concurrent_tasks
            .unwrap_or(DEFAULT_MAX_CONCURRENT_TASKS);
        if max_concurrent_tasks == 0 {
            return Err(MasterError::ConfigError(
                "[main].max_concurrent_tasks must be >= 1 (got 0)".to_string(),
            ));
        }

        let default_timeout_secs = self.main.default_timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);

        let tasks = self
            .task
            .into_iter()
            .enumerate()
            .map(|(position, section)| {
                validate_task(position, section, default_timeout_secs, log_dir)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ExecutionConfig::new_unchecked(
            max_concurrent_tasks,
            default_timeout_secs,
            tasks,
        ))
    }
}

fn validate_task(
    position: usize,
    section: TaskSection,
    default_timeout_secs: u64,
    log_dir: &Path,
) -> Result<TaskConfig> {
    let name = match section.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return Err(MasterError::ConfigError(format!(
                "task #{} is missing a name",
                position + 1
            )));
        }
    };
    if name.contains(['/', '\\']) {
        return Err(MasterError::ConfigError(format!(
            "task name '{name}' must not contain a path separator"
        )));
    }

    let directive = match section.kind {
        Some(TaskKind::Sleep) => {
            if section.exec_command.is_some() {
                return Err(MasterError::ConfigError(format!(
                    "SLEEP task '{name}' must not have `exec_command`"
                )));
            }
            let seconds = section.sleep_duration.ok_or_else(|| {
                MasterError::ConfigError(format!(
                    "SLEEP task '{name}' is missing `sleep_duration`"
                ))
            })?;
            Directive::Sleep { seconds }
        }
        Some(TaskKind::Exec) => {
            if section.sleep_duration.is_some() {
                return Err(MasterError::ConfigError(format!(
                    "EXEC task '{name}' must not have `sleep_duration`"
                )));
            }
            let command = section
                .exec_command
                .as_ref()
                .map(|c| c.to_line())
                .unwrap_or_default();
            if command.is_empty() {
                return Err(MasterError::ConfigError(format!(
                    "EXEC task '{name}' is missing `exec_command`"
                )));
            }
            Directive::Exec { command }
        }
        None => {
            return Err(MasterError::ConfigError(format!(
                "task '{name}' is missing `type` (expected \"SLEEP\" or \"EXEC\")"
            )));
        }
    };

    let timeout_secs = effective_timeout(section.timeout, default_timeout_secs);
    let log_path = log_dir.join(format!("{name}.log"));
    let requirements = section
        .requires
        .iter()
        .map(|r| r.trim().to_string())
        .collect();

    Ok(TaskConfig {
        name,
        requirements,
        directive,
        timeout_secs,
        log_path,
    })
}

/// A task timeout of `0`, or one above the global default, is clamped to the
/// global default.
pub fn effective_timeout(task_timeout: Option<u64>, default_timeout_secs: u64) -> u64 {
    match task_timeout {
        Some(t) if t != 0 && t <= default_timeout_secs => t,
        _ => default_timeout_secs,
    }
}
