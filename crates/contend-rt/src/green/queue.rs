// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Work-stealing task queues.
//!
//! Per-worker bounded FIFO + global injection queue. A worker that pulls
//! from the injector takes a batch and keeps the surplus locally, where
//! idle peers can steal it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::task::RawTask;
use crate::lock;

/// Max tasks in a single worker's local queue before overflow.
pub(crate) const CAPACITY: usize = 256;

/// Per-worker local queue.
///
/// Owner pops from the front, stealers take from the back. Both paths go
/// through one mutex.
pub(crate) struct LocalQueue {
    deque: Mutex<VecDeque<Arc<RawTask>>>,
}

impl LocalQueue {
    pub fn new() -> Self {
        Self {
            deque: Mutex::new(VecDeque::with_capacity(CAPACITY)),
        }
    }

    /// Push a task. Hands it back if the queue is full.
    pub fn push(&self, task: Arc<RawTask>) -> Result<(), Arc<RawTask>> {
        let mut q = lock(&self.deque);
        if q.len() >= CAPACITY {
            return Err(task);
        }
        q.push_back(task);
        Ok(())
    }

    pub fn pop(&self) -> Option<Arc<RawTask>> {
        lock(&self.deque).pop_front()
    }

    /// Steal half the queue from the back, at least one if non-empty.
    pub fn steal_batch(&self) -> Vec<Arc<RawTask>> {
        let mut q = lock(&self.deque);
        let count = (q.len() / 2).max(q.len().min(1));
        let mut stolen = Vec::with_capacity(count);
        for _ in 0..count {
            if let Some(task) = q.pop_back() {
                stolen.push(task);
            }
        }
        stolen
    }

    pub fn len(&self) -> usize {
        lock(&self.deque).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.deque).is_empty()
    }
}

/// Global injection queue. Spawns and wake-ups land here.
pub(crate) struct InjectorQueue {
    queue: Mutex<VecDeque<Arc<RawTask>>>,
}

impl InjectorQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, task: Arc<RawTask>) {
        lock(&self.queue).push_back(task);
    }

    /// Pop up to `n` tasks at once.
    pub fn pop_batch(&self, n: usize) -> Vec<Arc<RawTask>> {
        let mut q = lock(&self.queue);
        let count = n.min(q.len());
        q.drain(..count).collect()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.queue).is_empty()
    }

    pub fn len(&self) -> usize {
        lock(&self.queue).len()
    }
}
