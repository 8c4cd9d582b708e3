// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The master talks to an `ExecutorBackend` instead of spawning processes
//! itself. Production uses [`RealExecutorBackend`]; tests swap in a fake
//! backend that answers with scripted outcomes.
//!
//! A backend must report every spawned worker exactly once as a
//! [`WorkerExit`] on the channel the master reads from.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::{Directive, TaskConfig};
use crate::dag::WorkerId;
use crate::engine::ExitOutcome;
use crate::errors::Result;

use super::worker;

/// Everything a worker needs to run one task standalone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedTask {
    pub index: usize,
    pub name: String,
    pub directive: Directive,
    /// `None` means the task may run forever.
    pub timeout: Option<Duration>,
    pub log_path: PathBuf,
}

impl DispatchedTask {
    pub fn from_config(index: usize, task: &TaskConfig) -> Self {
        Self {
            index,
            name: task.name.clone(),
            directive: task.directive.clone(),
            timeout: task.timeout(),
            log_path: task.log_path.clone(),
        }
    }
}

/// A worker has been reaped.
#[derive(Debug)]
pub struct WorkerExit {
    pub pid: WorkerId,
    /// Raw OS completion, or the error hit while waiting for it.
    pub status: io::Result<ExitOutcome>,
}

/// Trait abstracting how a dispatched task is turned into a running worker.
pub trait ExecutorBackend: Send {
    /// Start a worker for `task` and return its pid.
    ///
    /// An error here is fatal to the run.
    fn spawn_worker(
        &mut self,
        task: DispatchedTask,
    ) -> Pin<Box<dyn Future<Output = Result<WorkerId>> + Send + '_>>;
}

/// Runs each task as a child process.
#[derive(Debug, Clone)]
pub struct RealExecutorBackend {
    exit_tx: mpsc::Sender<WorkerExit>,
}

impl RealExecutorBackend {
    /// Worker exits are reported on `exit_tx`.
    pub fn new(exit_tx: mpsc::Sender<WorkerExit>) -> Self {
        Self { exit_tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_worker(
        &mut self,
        task: DispatchedTask,
    ) -> Pin<Box<dyn Future<Output = Result<WorkerId>> + Send + '_>> {
        let tx = self.exit_tx.clone();
        Box::pin(async move { worker::spawn_worker(task, tx) })
    }
}
