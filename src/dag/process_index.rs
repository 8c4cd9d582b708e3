// src/dag/process_index.rs

use std::collections::HashMap;

/// OS process identifier of a worker.
pub type WorkerId = u32;

/// Live worker pid → task index.
///
/// An entry is created when a worker is spawned and taken exactly once when
/// that worker is reaped, so a pid maps to at most one live task.
#[derive(Debug, Clone, Default)]
pub struct ProcessIndex {
    live: HashMap<WorkerId, usize>,
}

impl ProcessIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pid` as running task `index`.
    ///
    /// Returns `false` (and leaves the map untouched) if `pid` is already
    /// registered to a live task.
    pub fn insert(&mut self, pid: WorkerId, index: usize) -> bool {
        if self.live.contains_key(&pid) {
            return false;
        }
        self.live.insert(pid, index);
        true
    }

    /// Task index of a live worker.
    pub fn get(&self, pid: WorkerId) -> Option<usize> {
        self.live.get(&pid).copied()
    }

    /// Resolve a reaped worker and forget it.
    pub fn take(&mut self, pid: WorkerId) -> Option<usize> {
        self.live.remove(&pid)
    }

    /// Number of live workers.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
