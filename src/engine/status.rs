// src/engine/status.rs

//! Shared per-task status table.
//!
//! The master loop is the only writer. The renderer thread reads it through
//! [`StatusTable::snapshot`]. Each call takes the lock for one short critical
//! section, so a reader may observe a state mid-run but never a torn entry.

use std::fmt;
use std::process::ExitStatus;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Not queued yet (or never will be).
    Unknown,
    /// Ready and waiting in the queue.
    Queued,
    /// A worker process is executing it.
    Running,
    /// Worker exited with status zero.
    Succeeded,
    /// Worker failed, or a dependency failed.
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

/// Raw completion of a worker process as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitOutcome {
    /// Terminated normally with this exit code.
    Exited(i32),
    /// Terminated by this signal.
    Signaled(i32),
}

impl ExitOutcome {
    pub fn is_success(self) -> bool {
        self == ExitOutcome::Exited(0)
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitOutcome::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitOutcome::Signaled(signal);
            }
        }

        ExitOutcome::Exited(-1)
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exited with code {code}"),
            ExitOutcome::Signaled(signal) => write!(f, "killed by signal {signal}"),
        }
    }
}

/// State plus raw outcome (once known) of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStatus {
    pub state: TaskState,
    pub outcome: Option<ExitOutcome>,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self {
            state: TaskState::Unknown,
            outcome: None,
        }
    }
}

/// One row of a [`StatusSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub index: usize,
    pub name: String,
    pub state: TaskState,
    pub outcome: Option<ExitOutcome>,
}

/// Point-in-time copy of the whole table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub rows: Vec<StatusRow>,
}

impl StatusSnapshot {
    /// Number of rows in `state`.
    pub fn count(&self, state: TaskState) -> usize {
        self.rows.iter().filter(|r| r.state == state).count()
    }

    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.rows.iter().find(|r| r.name == name).map(|r| r.state)
    }
}

#[derive(Debug)]
pub struct StatusTable {
    names: Vec<String>,
    entries: Mutex<Vec<TaskStatus>>,
}

impl StatusTable {
    /// Every task starts out [`TaskState::Unknown`].
    pub fn new(names: Vec<String>) -> Self {
        let entries = vec![TaskStatus::default(); names.len()];
        Self {
            names,
            entries: Mutex::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Move `index` to `state`.
    ///
    /// Terminal states are never left; such a request is logged and ignored.
    /// Returns whether the transition was applied.
    pub fn transition(&self, index: usize, state: TaskState) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(index) else {
            warn!(index, ?state, "status transition for unknown task index");
            return false;
        };

        if entry.state.is_terminal() {
            warn!(
                task = %self.names[index],
                from = ?entry.state,
                to = ?state,
                "refusing to leave terminal state"
            );
            return false;
        }

        entry.state = state;
        true
    }

    /// Store the raw OS completion of `index`.
    pub fn record_outcome(&self, index: usize, outcome: ExitOutcome) {
        if let Some(entry) = self.lock().get_mut(index) {
            entry.outcome = Some(outcome);
        }
    }

    pub fn status_of(&self, index: usize) -> Option<TaskStatus> {
        self.lock().get(index).copied()
    }

    pub fn state_of(&self, index: usize) -> Option<TaskState> {
        self.status_of(index).map(|s| s.state)
    }

    /// Number of tasks currently in `state`.
    pub fn count(&self, state: TaskState) -> usize {
        self.lock().iter().filter(|s| s.state == state).count()
    }

    /// Copy every entry under a single lock acquisition.
    pub fn snapshot(&self) -> StatusSnapshot {
        let entries = self.lock();
        let rows = entries
            .iter()
            .enumerate()
            .map(|(index, status)| StatusRow {
                index,
                name: self.names[index].clone(),
                state: status.state,
                outcome: status.outcome,
            })
            .collect();
        StatusSnapshot { rows }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TaskStatus>> {
        // Entries are plain data, so a panic elsewhere cannot leave them
        // half-updated.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
