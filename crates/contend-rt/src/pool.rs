// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Bounded worker pool.
//!
//! `pool_size` OS threads pull tasks from one multi-consumer channel. At
//! most `pool_size` tasks are in flight; the rest wait in the channel, so
//! a batch of N tasks of duration d takes about ceil(N / pool_size) * d.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, trace};

use crate::error::{panic_message, HarnessError};
use crate::spawner::Spawner;
use crate::work::{BlockingTask, SchedulingModel};

pub struct WorkerPool {
    /// Dropped to close the queue; workers exit once it drains.
    sender: Option<Sender<BlockingTask>>,
    workers: Vec<JoinHandle<()>>,
    pool_size: usize,
}

impl WorkerPool {
    /// Start `pool_size` worker threads.
    pub fn new(pool_size: usize) -> Result<Self, HarnessError> {
        if pool_size == 0 {
            return Err(HarnessError::InvalidPoolSize);
        }

        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut workers = Vec::with_capacity(pool_size);
        for id in 0..pool_size {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("contend-pool-{}", id))
                .spawn(move || worker_loop(id, receiver))?;
            workers.push(handle);
        }
        debug!(pool_size, "worker pool started");

        Ok(Self {
            sender: Some(sender),
            workers,
            pool_size,
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Tasks submitted but not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    fn join_workers(&mut self) -> Result<(), HarnessError> {
        self.sender = None;
        let mut first_panic = None;
        for handle in self.workers.drain(..) {
            if let Err(payload) = handle.join() {
                first_panic.get_or_insert_with(|| panic_message(payload));
            }
        }
        match first_panic {
            Some(msg) => Err(HarnessError::WorkerPanicked(msg)),
            None => Ok(()),
        }
    }
}

impl Spawner for WorkerPool {
    fn model(&self) -> SchedulingModel {
        SchedulingModel::Bounded {
            pool_size: self.pool_size,
        }
    }

    fn spawn(&self, task: BlockingTask) -> Result<(), HarnessError> {
        let sender = self.sender.as_ref().ok_or(HarnessError::Closed)?;
        sender.send(task).map_err(|_| HarnessError::Closed)
    }

    fn finish(mut self) -> Result<(), HarnessError> {
        self.join_workers()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            let _ = self.join_workers();
        }
    }
}

fn worker_loop(id: usize, tasks: Receiver<BlockingTask>) {
    let mut ran = 0usize;
    // Ends when every sender is gone and the queue is empty.
    for task in tasks.iter() {
        trace!(worker = id, task = task.id(), duration = ?task.duration(), "task picked up");
        task.run_blocking();
        ran += 1;
    }
    debug!(worker = id, ran, "pool worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::work::TaskTally;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn submit(pool: &WorkerPool, n: usize, d: Duration) -> (Arc<CancelToken>, Arc<TaskTally>) {
        let token = Arc::new(CancelToken::new());
        let tally = Arc::new(TaskTally::default());
        for id in 0..n {
            pool.spawn(BlockingTask::new(id, d, token.clone(), tally.clone()))
                .unwrap();
        }
        (token, tally)
    }

    #[test]
    fn zero_workers_rejected() {
        assert!(matches!(WorkerPool::new(0), Err(HarnessError::InvalidPoolSize)));
    }

    #[test]
    fn runs_every_task() {
        let pool = WorkerPool::new(3).unwrap();
        let (_, tally) = submit(&pool, 10, Duration::from_millis(1));
        pool.finish().unwrap();
        assert_eq!(tally.completed(), 10);
    }

    #[test]
    fn extra_tasks_queue_behind_workers() {
        let pool = WorkerPool::new(2).unwrap();
        let start = Instant::now();
        let (_, tally) = submit(&pool, 6, Duration::from_millis(50));
        pool.finish().unwrap();
        // 3 waves of 2.
        assert!(start.elapsed() >= Duration::from_millis(150));
        assert_eq!(tally.completed(), 6);
    }

    #[test]
    fn cancel_drains_queue_quickly() {
        let pool = WorkerPool::new(1).unwrap();
        let (token, tally) = submit(&pool, 20, Duration::from_secs(5));
        std::thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        token.cancel();
        pool.finish().unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(tally.interrupted(), 20);
    }

    #[test]
    fn reports_bounded_model() {
        let pool = WorkerPool::new(4).unwrap();
        assert_eq!(pool.model(), SchedulingModel::Bounded { pool_size: 4 });
        assert_eq!(pool.queued(), 0);
        pool.finish().unwrap();
    }
}
