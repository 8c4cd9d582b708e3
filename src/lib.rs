// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod render;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::{Directive, ExecutionConfig};
use crate::dag::TaskGraph;
use crate::engine::{Master, RunSummary, Scheduler, StatusSnapshot, StatusTable};
use crate::errors::Result;
use crate::exec::{RealExecutorBackend, WorkerExit};
use crate::render::Renderer;

/// Capacity of the worker exit channel.
const EXIT_CHANNEL_CAPACITY: usize = 64;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and plan resolution
/// - the shared status table and its renderer
/// - the process executor
/// - the master loop
pub async fn run(args: CliArgs) -> Result<RunSummary> {
    let cfg = load_and_validate(&args.config, &args.log_dir)?;

    if args.dry_run {
        let plan = TaskGraph::build(&cfg)?;
        print_dry_run(&cfg, &plan);
        return Ok(RunSummary {
            snapshot: StatusSnapshot::default(),
        });
    }

    if cfg.tasks.is_empty() {
        info!("no tasks configured; nothing to do");
        return Ok(RunSummary {
            snapshot: StatusSnapshot::default(),
        });
    }

    let plan = TaskGraph::build(&cfg)?;
    std::fs::create_dir_all(&args.log_dir)?;

    let status = Arc::new(StatusTable::new(plan.names.names().to_vec()));
    let renderer = Renderer::spawn(
        Arc::clone(&status),
        args.verbosity_type,
        Duration::from_secs(args.sleep_duration),
    )?;

    let (exit_tx, exit_rx) = mpsc::channel::<WorkerExit>(EXIT_CHANNEL_CAPACITY);
    let executor = RealExecutorBackend::new(exit_tx);

    let scheduler = Scheduler::new(plan.graph, status, cfg.max_concurrent_tasks);
    let master = Master::new(scheduler, cfg.tasks, executor, exit_rx);
    let result = master.run().await;

    if let Some(renderer) = renderer {
        renderer.finish();
    }
    result
}

/// Print every task with what it would run, without running it.
fn print_dry_run(cfg: &ExecutionConfig, plan: &TaskGraph) {
    println!("dagmaster dry-run");
    println!("  main.max_concurrent_tasks = {}", cfg.max_concurrent_tasks);
    println!("  main.default_timeout = {}", cfg.default_timeout_secs);
    println!();

    println!("tasks ({}):", cfg.tasks.len());
    for (index, task) in cfg.tasks.iter().enumerate() {
        println!("  - {}", task.name);
        match &task.directive {
            Directive::Exec { command } => println!("      exec: {command}"),
            Directive::Sleep { seconds } => println!("      sleep: {seconds}s"),
        }
        let requires: Vec<&str> = plan
            .graph
            .successors(index)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|dep| plan.names.name(dep))
            .collect();
        if !requires.is_empty() {
            println!("      requires: {requires:?}");
        }
        match task.timeout() {
            Some(limit) => println!("      timeout: {}s", limit.as_secs()),
            None => println!("      timeout: none"),
        }
        println!("      log: {}", task.log_path.display());
    }

    debug!("dry-run complete (no execution)");
}
