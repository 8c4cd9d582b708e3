// src/dag/plan.rs

//! Resolution of requirement names into the dependency graph.

use tracing::debug;

use crate::config::model::{ExecutionConfig, NO_REQUIREMENTS};
use crate::dag::graph::DirectedGraph;
use crate::dag::name_index::NameIndex;
use crate::errors::{MasterError, Result};

/// Name index plus the (acyclic) dependency graph of a run.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    pub names: NameIndex,
    pub graph: DirectedGraph,
}

impl TaskGraph {
    /// Resolve every task's requirements and check the result is a DAG.
    ///
    /// Fails with:
    /// - [`MasterError::DuplicateTask`] if two tasks share a name,
    /// - [`MasterError::MisplacedNone`] if `"none"` is not the only requirement,
    /// - [`MasterError::UnknownDependency`] for a name no task carries,
    /// - [`MasterError::DagCycle`] if the requirements form a cycle.
    pub fn build(cfg: &ExecutionConfig) -> Result<Self> {
        let names = NameIndex::from_names(cfg.tasks.iter().map(|t| t.name.clone()))?;
        let mut graph = DirectedGraph::new(names.len());

        for (index, task) in cfg.tasks.iter().enumerate() {
            for required in resolve_requirements(&task.name, &task.requirements)? {
                let target = names.get(required).ok_or_else(|| {
                    MasterError::UnknownDependency {
                        task: task.name.clone(),
                        dependency: required.to_string(),
                    }
                })?;
                graph.add_edge(index, target)?;
            }
        }

        if let Some(vertex) = graph.find_cycle() {
            let name = names.name(vertex).unwrap_or("?");
            return Err(MasterError::DagCycle(format!(
                "cycle detected in task requirements involving task '{name}'"
            )));
        }

        debug!(
            tasks = names.len(),
            edges = graph.edge_count(),
            "dependency graph built"
        );

        Ok(Self { names, graph })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Interpret a requirement list: empty or exactly `["none"]` means no
/// requirements, `"none"` next to real names is an error.
fn resolve_requirements<'a>(task: &str, requirements: &'a [String]) -> Result<&'a [String]> {
    let has_marker = requirements.iter().any(|r| r == NO_REQUIREMENTS);
    match (has_marker, requirements.len()) {
        (false, _) => Ok(requirements),
        (true, 1) => Ok(&[]),
        (true, _) => Err(MasterError::MisplacedNone(task.to_string())),
    }
}
