// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `Spawner` front end for the green scheduler.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use super::scheduler::Scheduler;
use super::task::RawTask;
use crate::error::HarnessError;
use crate::spawner::Spawner;
use crate::work::{BlockingTask, SchedulingModel};

/// Runs each task as an independent green task. There is no cap on how
/// many may be in flight.
pub struct GreenRuntime {
    scheduler: Scheduler,
    next_id: AtomicU64,
}

impl GreenRuntime {
    /// Start a runtime with `workers` worker threads (0 = one per core).
    pub fn new(workers: usize) -> Result<Self, HarnessError> {
        Ok(Self {
            scheduler: Scheduler::new(workers)?,
            next_id: AtomicU64::new(0),
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Spawn an arbitrary future as a green task.
    pub fn spawn_future<F>(&self, future: F) -> Result<(), HarnessError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.scheduler.is_shut_down() {
            return Err(HarnessError::Closed);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.scheduler.schedule(RawTask::new(id, Box::pin(future)));
        Ok(())
    }
}

impl Spawner for GreenRuntime {
    fn model(&self) -> SchedulingModel {
        SchedulingModel::Lightweight
    }

    fn spawn(&self, task: BlockingTask) -> Result<(), HarnessError> {
        let timer = self.scheduler.timer().clone();
        self.spawn_future(async move {
            task.run_green(timer).await;
        })
    }

    fn finish(self) -> Result<(), HarnessError> {
        self.scheduler.shutdown();
        match self.scheduler.panicked() {
            0 => Ok(()),
            n => Err(HarnessError::WorkerPanicked(format!("{} green task(s) panicked", n))),
        }
    }
}
