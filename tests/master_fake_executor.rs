// tests/master_fake_executor.rs

//! Master loop runs against the fake executor: no processes are spawned.

mod common;
use crate::common::builders::{ExecutionConfigBuilder, TaskConfigBuilder};
use crate::common::fake_executor::{CompletionOrder, FakeExecutor};
use crate::common::{init_tracing, scheduler_for, with_timeout};

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use dagmaster::config::ExecutionConfig;
use dagmaster::dag::WorkerId;
use dagmaster::engine::{ExitOutcome, Master, RunSummary, TaskState};
use dagmaster::errors::{MasterError, MasterStatus, Result};
use dagmaster::exec::{DispatchedTask, ExecutorBackend, WorkerExit};

type TestResult = std::result::Result<(), Box<dyn Error>>;

fn chain() -> ExecutionConfig {
    ExecutionConfigBuilder::new()
        .with_task(TaskConfigBuilder::exec("A", "echo A"))
        .with_task(TaskConfigBuilder::exec("B", "echo B").requires("A"))
        .with_task(TaskConfigBuilder::exec("C", "echo C").requires("B"))
        .build()
}

async fn run_with(
    cfg: &ExecutionConfig,
    configure: impl FnOnce(FakeExecutor) -> FakeExecutor,
    order: CompletionOrder,
) -> (Result<RunSummary>, Vec<String>) {
    let (scheduler, status, _) = scheduler_for(cfg);
    let (executor, exits) = FakeExecutor::new(order);
    let executor = configure(executor.observing(status));
    let log = executor.spawn_log();

    let master = Master::new(scheduler, cfg.tasks.clone(), executor, exits);
    let result = with_timeout(master.run()).await;
    (result, log.names())
}

#[tokio::test]
async fn chain_runs_in_dependency_order() -> TestResult {
    init_tracing();

    let (result, spawned) = run_with(&chain(), |e| e, CompletionOrder::Fifo).await;
    let summary = result?;

    assert_eq!(spawned, vec!["A", "B", "C"]);
    assert_eq!(summary.succeeded(), 3);
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.unfinished(), 0);
    Ok(())
}

#[tokio::test]
async fn empty_plan_finishes_without_spawning() -> TestResult {
    init_tracing();

    let cfg = ExecutionConfigBuilder::new().build();
    let (result, spawned) = run_with(&cfg, |e| e, CompletionOrder::Fifo).await;

    assert!(spawned.is_empty());
    assert_eq!(result?.total(), 0);
    Ok(())
}

#[tokio::test]
async fn failure_skips_dependents_but_run_still_succeeds() -> TestResult {
    init_tracing();

    let cfg = ExecutionConfigBuilder::new()
        .with_task(TaskConfigBuilder::exec("A", "false"))
        .with_task(TaskConfigBuilder::exec("B", "true").requires("A"))
        .with_task(TaskConfigBuilder::exec("other", "true"))
        .build();

    let (result, spawned) = run_with(
        &cfg,
        |e| e.with_outcome("A", ExitOutcome::Exited(1)),
        CompletionOrder::Fifo,
    )
    .await;
    let summary = result?;

    assert_eq!(spawned, vec!["A", "other"], "B must never be dispatched");
    assert_eq!(summary.state_of("A"), Some(TaskState::Failed));
    assert_eq!(summary.state_of("B"), Some(TaskState::Failed));
    assert_eq!(summary.state_of("other"), Some(TaskState::Succeeded));

    let a = &summary.snapshot.rows[0];
    assert_eq!(a.outcome, Some(ExitOutcome::Exited(1)));
    assert_eq!(summary.snapshot.rows[1].outcome, None);
    Ok(())
}

#[tokio::test]
async fn diamond_waits_for_both_branches() -> TestResult {
    init_tracing();

    let cfg = ExecutionConfigBuilder::new()
        .with_task(TaskConfigBuilder::exec("A", "true"))
        .with_task(TaskConfigBuilder::exec("B", "true").requires("A"))
        .with_task(TaskConfigBuilder::exec("C", "true").requires("A"))
        .with_task(TaskConfigBuilder::exec("D", "true").requires("B").requires("C"))
        .build();

    let (scheduler, status, _) = scheduler_for(&cfg);
    // Release C before B.
    let (executor, exits) = FakeExecutor::new(CompletionOrder::Scripted(vec![0, 1, 0]));
    let executor = executor.observing(status);
    let log = executor.spawn_log();

    let summary = with_timeout(Master::new(scheduler, cfg.tasks.clone(), executor, exits).run())
        .await?;

    assert_eq!(summary.succeeded(), 4);
    let records = log.records();
    let d = records.iter().find(|r| r.name == "D").expect("D spawned");
    let seen = d.snapshot.as_ref().expect("snapshot");
    assert_eq!(seen.state_of("B"), Some(TaskState::Succeeded));
    assert_eq!(seen.state_of("C"), Some(TaskState::Succeeded));
    Ok(())
}

#[tokio::test]
async fn never_exceeds_concurrency_limit() -> TestResult {
    init_tracing();

    let mut builder = ExecutionConfigBuilder::new().max_concurrent(3);
    for i in 0..10 {
        builder = builder.with_task(TaskConfigBuilder::sleep(&format!("t{i}"), 1));
    }
    let cfg = builder.build();

    let (scheduler, status, _) = scheduler_for(&cfg);
    let (executor, exits) = FakeExecutor::new(CompletionOrder::Scripted(vec![2, 0, 1, 2, 1]));
    let executor = executor.observing(status);
    let log = executor.spawn_log();

    let summary = with_timeout(Master::new(scheduler, cfg.tasks.clone(), executor, exits).run())
        .await?;

    assert_eq!(summary.succeeded(), 10);
    for record in log.records() {
        let running = record
            .snapshot
            .as_ref()
            .expect("snapshot")
            .count(TaskState::Running);
        assert!(running < 3, "{} spawned while {running} running", record.name);
    }
    Ok(())
}

#[tokio::test]
async fn spawn_failure_aborts_the_run() {
    init_tracing();

    let (result, _) = run_with(&chain(), |e| e.failing_spawn("B"), CompletionOrder::Fifo).await;

    let err = result.unwrap_err();
    assert!(matches!(err, MasterError::Spawn { ref task, .. } if task == "B"));
    assert_eq!(err.status(), MasterStatus::InternalError);
}

#[tokio::test]
async fn duplicate_live_pid_is_an_internal_error() {
    init_tracing();

    let cfg = ExecutionConfigBuilder::new()
        .with_task(TaskConfigBuilder::sleep("a", 1))
        .with_task(TaskConfigBuilder::sleep("b", 1))
        .build();
    let (result, _) = run_with(&cfg, |e| e.reusing_pids(), CompletionOrder::Fifo).await;

    let err = result.unwrap_err();
    assert!(matches!(err, MasterError::DuplicateProcess(1000)));
    assert_eq!(err.status(), MasterStatus::InternalError);
}

/// Backend that reports whatever pid / status it is told to, once.
struct ScriptedBackend {
    exit_tx: Option<mpsc::Sender<WorkerExit>>,
    report: Option<WorkerExit>,
}

impl ExecutorBackend for ScriptedBackend {
    fn spawn_worker(
        &mut self,
        _task: DispatchedTask,
    ) -> Pin<Box<dyn Future<Output = Result<WorkerId>> + Send + '_>> {
        Box::pin(async move {
            let tx = self.exit_tx.take();
            if let (Some(tx), Some(exit)) = (tx, self.report.take()) {
                tx.send(exit).await.expect("receiver alive");
            }
            Ok(7)
        })
    }
}

async fn run_scripted(report: Option<WorkerExit>) -> Result<RunSummary> {
    let cfg = ExecutionConfigBuilder::new()
        .with_task(TaskConfigBuilder::sleep("only", 1))
        .build();
    let (scheduler, _, _) = scheduler_for(&cfg);
    let (tx, rx) = mpsc::channel(4);
    let backend = ScriptedBackend {
        exit_tx: Some(tx),
        report,
    };
    with_timeout(Master::new(scheduler, cfg.tasks.clone(), backend, rx).run()).await
}

#[tokio::test]
async fn exit_of_unknown_pid_is_an_internal_error() {
    init_tracing();

    let err = run_scripted(Some(WorkerExit {
        pid: 99,
        status: Ok(ExitOutcome::Exited(0)),
    }))
    .await
    .unwrap_err();

    assert!(matches!(err, MasterError::UnknownProcess(99)));
    assert_eq!(err.status(), MasterStatus::InternalError);
}

#[tokio::test]
async fn wait_error_is_fatal() {
    init_tracing();

    let err = run_scripted(Some(WorkerExit {
        pid: 7,
        status: Err(std::io::Error::other("wait failed")),
    }))
    .await
    .unwrap_err();

    assert!(matches!(err, MasterError::Wait(_)));
    assert_eq!(err.status(), MasterStatus::InternalError);
}

#[tokio::test]
async fn closed_exit_channel_is_fatal() {
    init_tracing();

    // The sender is dropped without reporting anything.
    let err = run_scripted(None).await.unwrap_err();

    assert!(matches!(err, MasterError::Wait(ref msg) if msg.contains("closed")));
}
