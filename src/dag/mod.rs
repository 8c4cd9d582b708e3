// src/dag/mod.rs

//! Dependency bookkeeping for a run.
//!
//! - [`graph`] holds the mutable "depends on" graph with acyclicity checks.
//! - [`name_index`] maps task names to dense indices.
//! - [`plan`] resolves requirement names into a checked [`TaskGraph`].
//! - [`ready_queue`] is the FIFO of tasks waiting for a worker slot.
//! - [`process_index`] maps live worker pids back to task indices.

pub mod graph;
pub mod name_index;
pub mod plan;
pub mod process_index;
pub mod ready_queue;

pub use graph::{DirectedGraph, GraphError};
pub use name_index::NameIndex;
pub use plan::TaskGraph;
pub use process_index::{ProcessIndex, WorkerId};
pub use ready_queue::ReadyQueue;
