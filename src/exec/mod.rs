// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait the master spawns
//!   workers through, and the `RealExecutorBackend` used in production.
//! - [`worker`] runs one task as a child process: timeout, output capture,
//!   log file and exit reporting.

pub mod backend;
pub mod worker;

pub use backend::{DispatchedTask, ExecutorBackend, RealExecutorBackend, WorkerExit};
pub use worker::WorkerContext;
