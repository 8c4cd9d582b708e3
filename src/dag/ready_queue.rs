// src/dag/ready_queue.rs

use std::collections::VecDeque;

/// FIFO of task indices whose dependencies are all satisfied but which have
/// not been dispatched yet.
///
/// The queue itself does not deduplicate: callers push an index at most once
/// per run.
#[derive(Debug, Clone, Default)]
pub struct ReadyQueue {
    inner: VecDeque<usize>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `index` at the back.
    pub fn push(&mut self, index: usize) {
        self.inner.push_back(index);
    }

    /// Oldest queued index, if any.
    pub fn front(&self) -> Option<usize> {
        self.inner.front().copied()
    }

    /// Remove and return the oldest queued index.
    pub fn pop(&mut self) -> Option<usize> {
        self.inner.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Queued indices, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.inner.iter().copied()
    }
}
