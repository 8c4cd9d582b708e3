// src/errors.rs

//! Crate-wide error type and the process-level exit contract.
//!
//! Every fatal condition of a run is a [`MasterError`]. Task-level failures
//! (non-zero exit, signal, timeout) are *not* errors: they are recorded in the
//! status table and only poison the failed task's dependents.

use std::path::PathBuf;

use thiserror::Error;

use crate::dag::graph::GraphError;

/// Overall outcome of a master run, reported as the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterStatus {
    /// Every task reached a terminal state (some may have failed).
    Success,
    /// The config file could not be opened or read.
    BadFile,
    /// Config syntax or validation failed (duplicate names, unknown
    /// requirement, cycle, malformed field).
    ConfigError,
    /// Spawn/wait failures, resource errors, broken invariants.
    InternalError,
}

impl MasterStatus {
    pub fn code(self) -> i32 {
        match self {
            MasterStatus::Success => 0,
            MasterStatus::BadFile => 1,
            MasterStatus::ConfigError => 2,
            MasterStatus::InternalError => 3,
        }
    }
}

#[derive(Error, Debug)]
pub enum MasterError {
    #[error("reading config file {path:?}: {source}")]
    BadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("tasks with the same name occurred: '{0}'")]
    DuplicateTask(String),

    #[error("task '{task}' requires a task that does not exist: '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("task '{0}' lists \"none\" together with other requirements")]
    MisplacedNone(String),

    #[error("Cycle detected in requirements: {0}")]
    DagCycle(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("spawning worker for task '{task}': {source}")]
    Spawn {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker for task '{0}' exited before its pid could be read")]
    MissingPid(String),

    #[error("waiting for workers: {0}")]
    Wait(String),

    #[error("completion reported for unknown worker pid {0}")]
    UnknownProcess(u32),

    #[error("worker pid {0} is already registered to a live task")]
    DuplicateProcess(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MasterError {
    /// Map the error onto the process-level exit contract.
    pub fn status(&self) -> MasterStatus {
        match self {
            MasterError::BadFile { .. } => MasterStatus::BadFile,
            MasterError::Toml(_)
            | MasterError::ConfigError(_)
            | MasterError::DuplicateTask(_)
            | MasterError::UnknownDependency { .. }
            | MasterError::MisplacedNone(_)
            | MasterError::DagCycle(_) => MasterStatus::ConfigError,
            MasterError::Graph(_)
            | MasterError::Spawn { .. }
            | MasterError::MissingPid(_)
            | MasterError::Wait(_)
            | MasterError::UnknownProcess(_)
            | MasterError::DuplicateProcess(_)
            | MasterError::Io(_)
            | MasterError::Other(_) => MasterStatus::InternalError,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MasterError>;
