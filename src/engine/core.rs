// src/engine/core.rs

//! Pure scheduling state machine.
//!
//! [`Scheduler`] owns the dependency graph, the ready queue and the live
//! worker count, and is the only writer of the [`StatusTable`]. It performs
//! no IO and has no Tokio types, so it can be driven step by step from tests:
//!
//! 1. [`Scheduler::seed`] queues every task without dependencies.
//! 2. [`Scheduler::next_dispatch`] / [`Scheduler::mark_running`] move tasks
//!    out of the queue while under the concurrency limit.
//! 3. [`Scheduler::on_completion`] resolves one finished worker and reports
//!    what changed as a [`SchedulerStep`].
//!
//! The async shell around it lives in [`crate::engine::runtime`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::{DirectedGraph, GraphError, ReadyQueue};
use crate::engine::status::{ExitOutcome, StatusTable, TaskState};
use crate::errors::Result;

/// What a single completion changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Index of the task whose worker finished.
    pub completed: usize,
    /// Raw OS completion of that worker.
    pub outcome: ExitOutcome,
    /// Dependents that became ready, in the order they were queued.
    pub newly_queued: Vec<usize>,
    /// Tasks marked failed by this step: the completed task itself (if it
    /// failed) followed by every transitive dependent.
    pub newly_failed: Vec<usize>,
}

impl SchedulerStep {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }
}

#[derive(Debug)]
pub struct Scheduler {
    graph: DirectedGraph,
    queue: ReadyQueue,
    status: Arc<StatusTable>,
    max_concurrent: usize,
    running: usize,
}

impl Scheduler {
    /// `graph` must already be acyclic and sized like `status`.
    pub fn new(graph: DirectedGraph, status: Arc<StatusTable>, max_concurrent: usize) -> Self {
        Self {
            graph,
            queue: ReadyQueue::new(),
            status,
            max_concurrent: max_concurrent.max(1),
            running: 0,
        }
    }

    /// Queue every task that has no unresolved dependency, in index order.
    ///
    /// Returns the queued indices.
    pub fn seed(&mut self) -> Vec<usize> {
        let mut seeded = Vec::new();
        for index in 0..self.graph.len() {
            if self.graph.has_outgoing_edges(index).unwrap_or(true) {
                continue;
            }
            if self.enqueue(index) {
                seeded.push(index);
            }
        }
        debug!(?seeded, "seeded ready queue");
        seeded
    }

    /// Pop the next task to start, if a worker slot is free.
    pub fn next_dispatch(&mut self) -> Option<usize> {
        if self.running >= self.max_concurrent {
            return None;
        }
        self.queue.pop()
    }

    /// Record that a worker for `index` is now live.
    pub fn mark_running(&mut self, index: usize) {
        self.status.transition(index, TaskState::Running);
        self.running += 1;
    }

    /// Resolve the completion of the worker that ran `index`.
    pub fn on_completion(&mut self, index: usize, outcome: ExitOutcome) -> Result<SchedulerStep> {
        if index >= self.graph.len() {
            return Err(GraphError::VertexOutOfRange {
                vertex: index,
                size: self.graph.len(),
            }
            .into());
        }
        if self.running == 0 {
            warn!(index, "completion reported while no worker was running");
        }
        self.running = self.running.saturating_sub(1);
        self.status.record_outcome(index, outcome);

        let mut step = SchedulerStep {
            completed: index,
            outcome,
            newly_queued: Vec::new(),
            newly_failed: Vec::new(),
        };

        if outcome.is_success() {
            self.status.transition(index, TaskState::Succeeded);
            info!(task = self.task_name(index), index, "task succeeded");

            for dependent in self.graph.remove_edges_into(index)? {
                if self.graph.has_outgoing_edges(dependent)? {
                    continue;
                }
                if self.status.state_of(dependent) == Some(TaskState::Failed) {
                    continue;
                }
                if self.enqueue(dependent) {
                    step.newly_queued.push(dependent);
                }
            }
        } else {
            self.status.transition(index, TaskState::Failed);
            info!(task = self.task_name(index), index, %outcome, "task failed");
            step.newly_failed = self.propagate_failure(index)?;
        }

        Ok(step)
    }

    /// Mark every transitive dependent of `failed` as failed.
    ///
    /// Each vertex is visited at most once. Returns `failed` followed by the
    /// newly poisoned dependents in breadth-first order; dependents that were
    /// already failed are skipped.
    fn propagate_failure(&mut self, failed: usize) -> Result<Vec<usize>> {
        let mut visited = vec![false; self.graph.len()];
        visited[failed] = true;

        let mut order = vec![failed];
        let mut cursor = 0;
        while cursor < order.len() {
            let current = order[cursor];
            cursor += 1;
            for dependent in self.graph.dependents(current)? {
                if visited[dependent] {
                    continue;
                }
                visited[dependent] = true;
                // Already poisoned by an earlier failure, along with
                // everything above it.
                if self.status.state_of(dependent) == Some(TaskState::Failed) {
                    continue;
                }
                self.status.transition(dependent, TaskState::Failed);
                order.push(dependent);
            }
        }

        if order.len() > 1 {
            let poisoned: Vec<&str> = order[1..].iter().map(|&i| self.task_name(i)).collect();
            warn!(
                task = self.task_name(failed),
                ?poisoned,
                "dependents will not run"
            );
        }

        Ok(order)
    }

    fn enqueue(&mut self, index: usize) -> bool {
        if !self.status.transition(index, TaskState::Queued) {
            return false;
        }
        self.queue.push(index);
        debug!(task = self.task_name(index), index, "task queued");
        true
    }

    fn task_name(&self, index: usize) -> &str {
        self.status.name(index).unwrap_or("?")
    }

    /// No worker is live and nothing is waiting.
    pub fn is_done(&self) -> bool {
        self.running == 0 && self.queue.is_empty()
    }

    /// Number of live workers.
    pub fn running(&self) -> usize {
        self.running
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn queue(&self) -> &ReadyQueue {
        &self.queue
    }

    pub fn graph(&self) -> &DirectedGraph {
        &self.graph
    }

    pub fn status(&self) -> &Arc<StatusTable> {
        &self.status
    }
}
