// src/engine/mod.rs

//! Orchestration engine for dagmaster.
//!
//! - [`status`] is the per-task status table shared with the renderer.
//! - [`core`] is the pure scheduling state machine.
//! - [`runtime`] is the async master loop that spawns workers and feeds
//!   their exits back into the core.

pub mod core;
pub mod runtime;
pub mod status;

pub use core::{Scheduler, SchedulerStep};
pub use runtime::{Master, RunSummary};
pub use status::{ExitOutcome, StatusRow, StatusSnapshot, StatusTable, TaskState, TaskStatus};
