// tests/property/main.rs

use std::collections::HashSet;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;
use proptest::prelude::*;

use dagmaster::config::ExecutionConfig;
use dagmaster::dag::{DirectedGraph, TaskGraph};
use dagmaster::engine::{ExitOutcome, Master, Scheduler, StatusTable, TaskState};
use dagmaster_test_utils::builders::{ExecutionConfigBuilder, TaskConfigBuilder};
use dagmaster_test_utils::fake_executor::{CompletionOrder, FakeExecutor};

use std::sync::Arc;

/// A random DAG: task `i` may only require tasks `0..i`.
#[derive(Debug, Clone)]
struct Dag {
    deps: Vec<Vec<usize>>,
}

fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Dag> {
    (1..=max_tasks).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            |raw| {
                let deps = raw
                    .into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        let set: HashSet<usize> = if i == 0 {
                            HashSet::new()
                        } else {
                            picks.into_iter().map(|p| p % i).collect()
                        };
                        let mut deps: Vec<usize> = set.into_iter().collect();
                        deps.sort_unstable();
                        deps
                    })
                    .collect();
                Dag { deps }
            },
        )
    })
}

impl Dag {
    fn len(&self) -> usize {
        self.deps.len()
    }

    fn config(&self, max_concurrent: usize) -> ExecutionConfig {
        let mut builder = ExecutionConfigBuilder::new().max_concurrent(max_concurrent);
        for (i, deps) in self.deps.iter().enumerate() {
            let mut task = TaskConfigBuilder::exec(&format!("t{i}"), "true");
            for d in deps {
                task = task.requires(&format!("t{d}"));
            }
            builder = builder.with_task(task);
        }
        builder.build()
    }

    /// Tasks that transitively require `failed` (excluding it).
    fn transitive_dependents(&self, failed: usize) -> HashSet<usize> {
        let mut out = HashSet::new();
        // Dependents always have a larger index.
        for i in failed + 1..self.len() {
            if self.deps[i]
                .iter()
                .any(|&d| d == failed || out.contains(&d))
            {
                out.insert(i);
            }
        }
        out
    }
}

fn outcome_for(failing: &[bool], index: usize) -> ExitOutcome {
    if failing.get(index).copied().unwrap_or(false) {
        ExitOutcome::Exited(1)
    } else {
        ExitOutcome::Exited(0)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn acyclicity_agrees_with_petgraph(
        n in 1usize..9,
        edges in proptest::collection::vec((0usize..9, 0usize..9), 0..20),
    ) {
        let mut ours = DirectedGraph::new(n);
        let mut theirs = DiGraph::<(), ()>::new();
        let nodes: Vec<_> = (0..n).map(|_| theirs.add_node(())).collect();

        for (from, to) in edges {
            let (from, to) = (from % n, to % n);
            ours.add_edge(from, to).unwrap();
            theirs.add_edge(nodes[from], nodes[to], ());
        }

        prop_assert_eq!(ours.is_acyclic(), !is_cyclic_directed(&theirs));
    }

    #[test]
    fn scheduler_respects_dependencies_limit_and_failures(
        dag in dag_strategy(12),
        max_concurrent in 1usize..5,
        failing in proptest::collection::vec(proptest::bool::weighted(0.25), 12),
        choices in proptest::collection::vec(any::<usize>(), 0..64),
    ) {
        let cfg = dag.config(max_concurrent);
        let plan = TaskGraph::build(&cfg).unwrap();
        let status = Arc::new(StatusTable::new(plan.names.names().to_vec()));
        let mut sched = Scheduler::new(plan.graph, Arc::clone(&status), max_concurrent);

        let mut running: Vec<usize> = Vec::new();
        let mut dispatched: HashSet<usize> = HashSet::new();
        let mut choices = choices.into_iter();

        sched.seed();
        let mut steps = 0;
        loop {
            while let Some(i) = sched.next_dispatch() {
                for &d in &dag.deps[i] {
                    prop_assert_eq!(status.state_of(d), Some(TaskState::Succeeded));
                }
                prop_assert!(dispatched.insert(i), "task {} dispatched twice", i);
                sched.mark_running(i);
                running.push(i);
                prop_assert!(running.len() <= max_concurrent);
                prop_assert_eq!(status.count(TaskState::Running), running.len());
            }

            if sched.is_done() {
                break;
            }
            prop_assert!(!running.is_empty(), "not done but nothing running");

            let pick = choices.next().unwrap_or(0) % running.len();
            let finished = running.remove(pick);
            sched.on_completion(finished, outcome_for(&failing, finished)).unwrap();

            steps += 1;
            prop_assert!(steps <= dag.len(), "more completions than tasks");
        }

        let snapshot = status.snapshot();
        for row in &snapshot.rows {
            prop_assert!(row.state.is_terminal(), "{} ended {:?}", row.name, row.state);
        }

        for &i in &dispatched {
            if outcome_for(&failing, i).is_success() {
                prop_assert_eq!(status.state_of(i), Some(TaskState::Succeeded));
            } else {
                prop_assert_eq!(status.state_of(i), Some(TaskState::Failed));
                for dependent in dag.transitive_dependents(i) {
                    prop_assert_eq!(status.state_of(dependent), Some(TaskState::Failed));
                    prop_assert!(!dispatched.contains(&dependent));
                }
            }
        }
    }

    #[test]
    fn master_run_with_random_completion_order(
        dag in dag_strategy(10),
        max_concurrent in 1usize..4,
        failing in proptest::collection::vec(proptest::bool::weighted(0.2), 10),
        choices in proptest::collection::vec(any::<usize>(), 0..32),
    ) {
        let cfg = dag.config(max_concurrent);
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (summary, records) = rt.block_on(async {
            let plan = TaskGraph::build(&cfg).unwrap();
            let status = Arc::new(StatusTable::new(plan.names.names().to_vec()));
            let scheduler = Scheduler::new(plan.graph, Arc::clone(&status), max_concurrent);

            let (mut executor, exits) = FakeExecutor::new(CompletionOrder::Scripted(choices));
            for (i, fail) in failing.iter().enumerate().take(dag.len()) {
                if *fail {
                    executor = executor.with_outcome(&format!("t{i}"), ExitOutcome::Exited(1));
                }
            }
            let executor = executor.observing(status);
            let log = executor.spawn_log();

            let summary = Master::new(scheduler, cfg.tasks.clone(), executor, exits)
                .run()
                .await
                .unwrap();
            (summary, log.records())
        });

        prop_assert_eq!(summary.unfinished(), 0);
        for record in &records {
            let seen = record.snapshot.as_ref().unwrap();
            prop_assert!(seen.count(TaskState::Running) < max_concurrent);
            for &d in &dag.deps[record.index] {
                prop_assert_eq!(seen.rows[d].state, TaskState::Succeeded);
            }
        }
    }
}
