#![allow(dead_code)]

use std::path::PathBuf;

use dagmaster::config::model::DEFAULT_TIMEOUT_SECS;
use dagmaster::config::{Directive, ExecutionConfig, TaskConfig, effective_timeout};

/// Builder for `ExecutionConfig` to simplify test setup.
///
/// Tasks keep the order in which they are added, which is their index.
pub struct ExecutionConfigBuilder {
    max_concurrent_tasks: usize,
    default_timeout_secs: u64,
    log_dir: PathBuf,
    tasks: Vec<TaskConfigBuilder>,
}

impl ExecutionConfigBuilder {
    pub fn new() -> Self {
        Self {
            max_concurrent_tasks: 4,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_dir: std::env::temp_dir().join("dagmaster-test-logs"),
            tasks: Vec::new(),
        }
    }

    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent_tasks = n;
        self
    }

    pub fn default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    /// Directory used for tasks without an explicit log path.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn with_task(mut self, task: TaskConfigBuilder) -> Self {
        self.tasks.push(task);
        self
    }

    /// Clamps timeouts and fills in log paths the way validation does.
    pub fn build(self) -> ExecutionConfig {
        let tasks = self
            .tasks
            .into_iter()
            .map(|t| t.finish(&self.log_dir, self.default_timeout_secs))
            .collect();
        ExecutionConfig::new_unchecked(self.max_concurrent_tasks, self.default_timeout_secs, tasks)
    }
}

impl Default for ExecutionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    name: String,
    directive: Directive,
    requirements: Vec<String>,
    timeout: Option<u64>,
    log_path: Option<PathBuf>,
}

impl TaskConfigBuilder {
    pub fn exec(name: &str, command: &str) -> Self {
        Self::with_directive(
            name,
            Directive::Exec {
                command: command.to_string(),
            },
        )
    }

    pub fn sleep(name: &str, seconds: u64) -> Self {
        Self::with_directive(name, Directive::Sleep { seconds })
    }

    fn with_directive(name: &str, directive: Directive) -> Self {
        Self {
            name: name.to_string(),
            directive,
            requirements: Vec::new(),
            timeout: None,
            log_path: None,
        }
    }

    pub fn requires(mut self, dep: &str) -> Self {
        self.requirements.push(dep.to_string());
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    fn finish(self, log_dir: &std::path::Path, default_timeout_secs: u64) -> TaskConfig {
        let log_path = self
            .log_path
            .unwrap_or_else(|| log_dir.join(format!("{}.log", self.name)));
        TaskConfig {
            name: self.name,
            requirements: self.requirements,
            directive: self.directive,
            timeout_secs: effective_timeout(self.timeout, default_timeout_secs),
            log_path,
        }
    }
}
