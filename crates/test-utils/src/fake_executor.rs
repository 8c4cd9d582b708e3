use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use dagmaster::dag::WorkerId;
use dagmaster::engine::{ExitOutcome, StatusSnapshot, StatusTable};
use dagmaster::errors::{MasterError, Result};
use dagmaster::exec::{DispatchedTask, ExecutorBackend, WorkerExit};

/// Order in which the fake releases the exits of pending workers.
#[derive(Debug, Clone)]
pub enum CompletionOrder {
    /// Oldest spawned worker first.
    Fifo,
    /// Each entry picks `entry % pending` among the pending workers (oldest
    /// first). Falls back to FIFO once the script runs out.
    Scripted(Vec<usize>),
}

/// One call to `spawn_worker`.
#[derive(Debug, Clone)]
pub struct SpawnRecord {
    pub index: usize,
    pub name: String,
    pub pid: WorkerId,
    /// Status table as seen at spawn time, if a table was attached.
    pub snapshot: Option<StatusSnapshot>,
}

/// Shared handle on the spawn history, usable after the executor moved into
/// a `Master`.
#[derive(Debug, Clone, Default)]
pub struct SpawnLog(Arc<Mutex<Vec<SpawnRecord>>>);

impl SpawnLog {
    pub fn records(&self) -> Vec<SpawnRecord> {
        self.0.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.name).collect()
    }

    fn push(&self, record: SpawnRecord) {
        self.0.lock().unwrap().push(record);
    }
}

/// A fake executor that:
/// - spawns no processes and hands out increasing fake pids
/// - answers each task with a scripted `ExitOutcome` (success by default)
/// - records every spawn, with a status snapshot if a table is attached
/// - releases exits from a driver task in the chosen `CompletionOrder`
///
/// The exit channel has capacity one, so the driver picks the next exit
/// only after the master took the previous one and dispatched whatever that
/// unlocked.
pub struct FakeExecutor {
    next_pid: WorkerId,
    outcomes: HashMap<String, ExitOutcome>,
    failing_spawns: HashSet<String>,
    reuse_pid: bool,
    status: Option<Arc<StatusTable>>,
    log: SpawnLog,
    spawned_tx: mpsc::UnboundedSender<WorkerExit>,
}

impl FakeExecutor {
    /// Must be called inside a Tokio runtime: the driver task starts here.
    pub fn new(order: CompletionOrder) -> (Self, mpsc::Receiver<WorkerExit>) {
        let (spawned_tx, spawned_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = mpsc::channel(1);
        tokio::spawn(drive(spawned_rx, exit_tx, order));

        let executor = Self {
            next_pid: 1000,
            outcomes: HashMap::new(),
            failing_spawns: HashSet::new(),
            reuse_pid: false,
            status: None,
            log: SpawnLog::default(),
            spawned_tx,
        };
        (executor, exit_rx)
    }

    /// Report `outcome` for the worker of `task`.
    pub fn with_outcome(mut self, task: &str, outcome: ExitOutcome) -> Self {
        self.outcomes.insert(task.to_string(), outcome);
        self
    }

    /// Fail `spawn_worker` for `task`.
    pub fn failing_spawn(mut self, task: &str) -> Self {
        self.failing_spawns.insert(task.to_string());
        self
    }

    /// Hand out the same pid for every worker.
    pub fn reusing_pids(mut self) -> Self {
        self.reuse_pid = true;
        self
    }

    /// Snapshot this table on every spawn.
    pub fn observing(mut self, status: Arc<StatusTable>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn spawn_log(&self) -> SpawnLog {
        self.log.clone()
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_worker(
        &mut self,
        task: DispatchedTask,
    ) -> Pin<Box<dyn Future<Output = Result<WorkerId>> + Send + '_>> {
        Box::pin(async move {
            if self.failing_spawns.contains(&task.name) {
                return Err(MasterError::Spawn {
                    task: task.name.clone(),
                    source: io::Error::other("scripted spawn failure"),
                });
            }

            let pid = self.next_pid;
            if !self.reuse_pid {
                self.next_pid += 1;
            }

            self.log.push(SpawnRecord {
                index: task.index,
                name: task.name.clone(),
                pid,
                snapshot: self.status.as_ref().map(|s| s.snapshot()),
            });

            let outcome = self
                .outcomes
                .get(&task.name)
                .copied()
                .unwrap_or(ExitOutcome::Exited(0));
            self.spawned_tx
                .send(WorkerExit {
                    pid,
                    status: Ok(outcome),
                })
                .map_err(|_| MasterError::Wait("fake executor driver stopped".to_string()))?;

            Ok(pid)
        })
    }
}

async fn drive(
    mut spawned_rx: mpsc::UnboundedReceiver<WorkerExit>,
    exit_tx: mpsc::Sender<WorkerExit>,
    order: CompletionOrder,
) {
    let mut script = match order {
        CompletionOrder::Fifo => Vec::new(),
        CompletionOrder::Scripted(choices) => choices,
    }
    .into_iter();
    let mut pending: Vec<WorkerExit> = Vec::new();

    loop {
        let Ok(permit) = exit_tx.reserve().await else {
            return;
        };

        if pending.is_empty() {
            match spawned_rx.recv().await {
                Some(exit) => pending.push(exit),
                None => return,
            }
        }
        while let Ok(exit) = spawned_rx.try_recv() {
            pending.push(exit);
        }

        let pick = script.next().map_or(0, |choice| choice % pending.len());
        permit.send(pending.remove(pick));
    }
}
