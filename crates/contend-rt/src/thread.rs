// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! One OS thread per task.
//!
//! No concurrency ceiling, but every unit is a full kernel thread with
//! its own stack. Each task thread catches its own panic so one bad task
//! doesn't take the batch down.

use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use crate::error::{panic_message, HarnessError};
use crate::lock;
use crate::spawner::Spawner;
use crate::work::{BlockingTask, SchedulingModel};

/// Small stacks: the task body is a single wait.
const TASK_STACK_SIZE: usize = 64 * 1024;

#[derive(Default)]
pub struct ThreadPerTask {
    handles: Mutex<Vec<JoinHandle<Result<(), String>>>>,
}

impl ThreadPerTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Threads spawned so far.
    pub fn spawned(&self) -> usize {
        lock(&self.handles).len()
    }

    /// Join every thread spawned so far. Returns the first panic message.
    fn join_all(&self) -> Option<String> {
        let handles = std::mem::take(&mut *lock(&self.handles));
        let mut first_panic = None;
        for handle in handles {
            let result = handle.join().map_err(panic_message).and_then(|r| r);
            if let Err(msg) = result {
                first_panic.get_or_insert(msg);
            }
        }
        first_panic
    }
}

impl Spawner for ThreadPerTask {
    fn model(&self) -> SchedulingModel {
        SchedulingModel::ThreadPerTask
    }

    fn spawn(&self, task: BlockingTask) -> Result<(), HarnessError> {
        let handle = thread::Builder::new()
            .name(format!("contend-task-{}", task.id()))
            .stack_size(TASK_STACK_SIZE)
            .spawn(move || {
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    task.run_blocking();
                }))
                .map_err(panic_message)
            })?;
        lock(&self.handles).push(handle);
        Ok(())
    }

    fn finish(self) -> Result<(), HarnessError> {
        match self.join_all() {
            Some(msg) => Err(HarnessError::WorkerPanicked(msg)),
            None => Ok(()),
        }
    }
}

impl Drop for ThreadPerTask {
    fn drop(&mut self) {
        let _ = self.join_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::work::TaskTally;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[test]
    fn all_tasks_overlap() {
        let spawner = ThreadPerTask::new();
        let token = Arc::new(CancelToken::new());
        let tally = Arc::new(TaskTally::default());
        let start = Instant::now();
        for id in 0..50 {
            spawner
                .spawn(BlockingTask::new(id, Duration::from_millis(100), token.clone(), tally.clone()))
                .unwrap();
        }
        assert_eq!(spawner.spawned(), 50);
        spawner.finish().unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(tally.completed(), 50);
    }

    #[test]
    fn drop_joins_spawned_threads() {
        let token = Arc::new(CancelToken::new());
        let tally = Arc::new(TaskTally::default());
        {
            let spawner = ThreadPerTask::new();
            for id in 0..5 {
                spawner
                    .spawn(BlockingTask::new(id, Duration::from_millis(50), token.clone(), tally.clone()))
                    .unwrap();
            }
        }
        assert_eq!(tally.completed(), 5);
    }

    #[test]
    fn finish_with_nothing_spawned() {
        let spawner = ThreadPerTask::new();
        assert_eq!(spawner.model(), SchedulingModel::ThreadPerTask);
        spawner.finish().unwrap();
    }
}
