#![allow(dead_code, unused_imports)]

pub use dagmaster_test_utils::{builders, fake_executor, init_tracing, with_timeout};

use std::sync::Arc;

use dagmaster::config::ExecutionConfig;
use dagmaster::dag::TaskGraph;
use dagmaster::engine::{Scheduler, StatusTable};

/// Build the plan, a fresh status table and a scheduler for `cfg`.
pub fn scheduler_for(cfg: &ExecutionConfig) -> (Scheduler, Arc<StatusTable>, TaskGraph) {
    let plan = TaskGraph::build(cfg).expect("valid plan");
    let status = Arc::new(StatusTable::new(plan.names.names().to_vec()));
    let scheduler = Scheduler::new(
        plan.graph.clone(),
        Arc::clone(&status),
        cfg.max_concurrent_tasks,
    );
    (scheduler, status, plan)
}
