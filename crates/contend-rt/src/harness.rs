// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Batch runner.
//!
//! Submits N identical blocking tasks to a spawner, waits for all of them
//! and reports how long that took. The bounded pool needs about
//! ceil(N / pool_size) task durations; the green runtime about one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::green::GreenRuntime;
use crate::pool::WorkerPool;
use crate::spawner::Spawner;
use crate::thread::ThreadPerTask;
use crate::work::{BlockingTask, SchedulingModel, TaskTally};

/// Outcome of one harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskResult {
    task_count: usize,
    model: SchedulingModel,
    elapsed: Duration,
    completed: usize,
    interrupted: usize,
}

impl TaskResult {
    pub fn task_count(&self) -> usize {
        self.task_count
    }

    pub fn model(&self) -> SchedulingModel {
        self.model
    }

    /// Wall-clock time from first submission to last completion.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Tasks that waited their full duration.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Tasks cut short by cancellation.
    pub fn interrupted(&self) -> usize {
        self.interrupted
    }
}

/// Runs task batches under the different scheduling models.
///
/// The harness owns one cancellation token shared by every task it
/// issues. Once cancelled it stays cancelled: later runs finish
/// immediately with every task interrupted.
#[derive(Debug)]
pub struct Harness {
    config: HarnessConfig,
    token: Arc<CancelToken>,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            token: Arc::new(CancelToken::new()),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Token a supervisor can cancel to interrupt in-flight tasks.
    pub fn cancel_token(&self) -> Arc<CancelToken> {
        self.token.clone()
    }

    /// Run `task_count` tasks on a pool of `pool_size` OS threads.
    pub fn run_bounded(&self, task_count: usize, pool_size: usize) -> Result<TaskResult, HarnessError> {
        self.run_with(WorkerPool::new(pool_size)?, task_count)
    }

    /// Run `task_count` tasks as green tasks, all in flight at once.
    pub fn run_lightweight(&self, task_count: usize) -> Result<TaskResult, HarnessError> {
        self.run_with(GreenRuntime::new(self.config.lightweight_workers)?, task_count)
    }

    /// Run `task_count` tasks, one OS thread each.
    pub fn run_thread_per_task(&self, task_count: usize) -> Result<TaskResult, HarnessError> {
        self.run_with(ThreadPerTask::new(), task_count)
    }

    /// Run `task_count` tasks on any spawner and time the batch.
    pub fn run_with<S: Spawner>(&self, spawner: S, task_count: usize) -> Result<TaskResult, HarnessError> {
        let model = spawner.model();
        let tally = Arc::new(TaskTally::default());
        debug!(%model, task_count, duration = ?self.config.task_duration, "run starting");

        let start = Instant::now();
        for id in 0..task_count {
            spawner.spawn(BlockingTask::new(
                id,
                self.config.task_duration,
                self.token.clone(),
                tally.clone(),
            ))?;
        }
        spawner.finish()?;
        let elapsed = start.elapsed();

        let result = TaskResult {
            task_count,
            model,
            elapsed,
            completed: tally.completed(),
            interrupted: tally.interrupted(),
        };

        if result.interrupted > 0 {
            warn!(%model, interrupted = result.interrupted, "run interrupted");
        }
        info!(
            %model,
            task_count,
            elapsed_ms = elapsed.as_millis() as u64,
            completed = result.completed,
            "run finished"
        );
        Ok(result)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

/// Lower bound for a bounded run: ceil(tasks / pool) waves of `duration`.
pub fn bounded_lower_bound(task_count: usize, pool_size: usize, duration: Duration) -> Duration {
    if pool_size == 0 {
        return Duration::MAX;
    }
    let waves = task_count.div_ceil(pool_size);
    duration.saturating_mul(u32::try_from(waves).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(ms: u64) -> Harness {
        Harness::new(HarnessConfig::default().with_task_duration(Duration::from_millis(ms)))
    }

    #[test]
    fn lower_bound_rounds_up() {
        let d = Duration::from_secs(1);
        assert_eq!(bounded_lower_bound(20, 5, d), Duration::from_secs(4));
        assert_eq!(bounded_lower_bound(21, 5, d), Duration::from_secs(5));
        assert_eq!(bounded_lower_bound(0, 5, d), Duration::ZERO);
        assert_eq!(bounded_lower_bound(3, 0, d), Duration::MAX);
    }

    #[test]
    fn bounded_run_reports_waves() {
        let h = quick(50);
        let r = h.run_bounded(8, 2).unwrap();
        assert_eq!(r.model(), SchedulingModel::Bounded { pool_size: 2 });
        assert_eq!(r.task_count(), 8);
        assert_eq!(r.completed(), 8);
        assert_eq!(r.interrupted(), 0);
        assert!(r.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn config_is_kept() {
        let h = Harness::new(
            HarnessConfig::default()
                .with_task_duration(Duration::from_millis(250))
                .with_lightweight_workers(3),
        );
        assert_eq!(h.config().task_duration, Duration::from_millis(250));
        assert_eq!(h.config().lightweight_workers, 3);
        assert_eq!(Harness::default().config(), &HarnessConfig::default());
    }

    #[test]
    fn zero_pool_is_an_error() {
        let h = quick(10);
        assert!(matches!(h.run_bounded(4, 0), Err(HarnessError::InvalidPoolSize)));
    }

    #[test]
    fn empty_batch_is_instant() {
        let h = quick(1_000);
        let r = h.run_lightweight(0).unwrap();
        assert_eq!(r.completed(), 0);
        assert!(r.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn lightweight_run_completes_all() {
        let h = quick(50);
        let r = h.run_lightweight(300).unwrap();
        assert_eq!(r.model(), SchedulingModel::Lightweight);
        assert_eq!(r.completed(), 300);
    }

    #[test]
    fn thread_per_task_run_completes_all() {
        let h = quick(50);
        let r = h.run_thread_per_task(40).unwrap();
        assert_eq!(r.model(), SchedulingModel::ThreadPerTask);
        assert_eq!(r.completed(), 40);
    }

    #[test]
    fn cancelled_harness_interrupts_later_runs() {
        let h = quick(5_000);
        h.cancel_token().cancel();
        let r = h.run_bounded(10, 2).unwrap();
        assert_eq!(r.interrupted(), 10);
        assert!(r.elapsed() < Duration::from_secs(2));
        assert!(h.cancel_token().is_cancelled());
    }
}
