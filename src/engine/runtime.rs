// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::TaskConfig;
use crate::dag::{GraphError, ProcessIndex};
use crate::engine::status::{StatusSnapshot, TaskState};
use crate::errors::{MasterError, Result};
use crate::exec::{DispatchedTask, ExecutorBackend, WorkerExit};

use super::core::Scheduler;

/// Final state of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub snapshot: StatusSnapshot,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.snapshot.count(TaskState::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.snapshot.count(TaskState::Failed)
    }

    /// Tasks that never reached a terminal state.
    pub fn unfinished(&self) -> usize {
        self.snapshot
            .rows
            .iter()
            .filter(|r| !r.state.is_terminal())
            .count()
    }

    pub fn total(&self) -> usize {
        self.snapshot.rows.len()
    }

    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.snapshot.state_of(name)
    }
}

/// Drives the [`Scheduler`] against real (or fake) workers.
///
/// This is the IO shell around the core: it spawns workers through an
/// [`ExecutorBackend`], remembers which pid runs which task, and waits for
/// [`WorkerExit`]s. Waiting for the next exit is the loop's only suspension
/// point; exits are handled one at a time in the order they arrive.
pub struct Master<E: ExecutorBackend> {
    scheduler: Scheduler,
    tasks: Vec<TaskConfig>,
    executor: E,
    exits: mpsc::Receiver<WorkerExit>,
    processes: ProcessIndex,
}

impl<E: ExecutorBackend> fmt::Debug for Master<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Master")
            .field("scheduler", &self.scheduler)
            .field("processes", &self.processes)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Master<E> {
    /// `tasks` must be in index order; `exits` must receive every exit of a
    /// worker spawned through `executor`.
    pub fn new(
        scheduler: Scheduler,
        tasks: Vec<TaskConfig>,
        executor: E,
        exits: mpsc::Receiver<WorkerExit>,
    ) -> Self {
        Self {
            scheduler,
            tasks,
            executor,
            exits,
            processes: ProcessIndex::new(),
        }
    }

    /// Run every reachable task to a terminal state.
    ///
    /// Task failures are not errors; they are visible in the returned
    /// summary. Spawn or wait problems abort the run.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!(tasks = self.tasks.len(), "master started");

        self.scheduler.seed();

        loop {
            self.dispatch_ready().await?;

            if self.scheduler.is_done() {
                break;
            }

            let exit = self.exits.recv().await.ok_or_else(|| {
                MasterError::Wait(format!(
                    "completion channel closed with {} worker(s) running",
                    self.scheduler.running()
                ))
            })?;

            let pid = exit.pid;
            let outcome = exit
                .status
                .map_err(|e| MasterError::Wait(format!("worker pid {pid}: {e}")))?;
            let index = self
                .processes
                .take(pid)
                .ok_or(MasterError::UnknownProcess(pid))?;

            debug!(pid, index, %outcome, "worker exited");
            let step = self.scheduler.on_completion(index, outcome)?;
            debug!(
                queued = ?step.newly_queued,
                failed = ?step.newly_failed,
                "completion resolved"
            );
        }

        let summary = RunSummary {
            snapshot: self.scheduler.status().snapshot(),
        };
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            unfinished = summary.unfinished(),
            "master finished"
        );
        Ok(summary)
    }

    /// Start queued tasks until the queue is empty or every slot is taken.
    async fn dispatch_ready(&mut self) -> Result<()> {
        while let Some(index) = self.scheduler.next_dispatch() {
            let task = self.tasks.get(index).ok_or(GraphError::VertexOutOfRange {
                vertex: index,
                size: self.tasks.len(),
            })?;
            let dispatched = DispatchedTask::from_config(index, task);
            let name = dispatched.name.clone();

            let pid = self.executor.spawn_worker(dispatched).await?;
            if !self.processes.insert(pid, index) {
                return Err(MasterError::DuplicateProcess(pid));
            }
            self.scheduler.mark_running(index);

            info!(task = %name, index, pid, "task dispatched");
        }
        Ok(())
    }
}
