// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The simulated blocking task.
//!
//! A task waits for a fixed duration, standing in for a blocking I/O
//! call. It produces no value: only when it finishes, and whether it was
//! interrupted, is observed. The wait holds no lock.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::cancel::CancelToken;
use crate::green::timer::TimerDriver;
use crate::sleep::{blocking_sleep, GreenSleep, WaitOutcome};

/// Which execution model ran a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingModel {
    /// Fixed number of OS worker threads; extra tasks queue.
    Bounded { pool_size: usize },
    /// Green tasks on the M:N scheduler; no population limit.
    Lightweight,
    /// One OS thread per task.
    ThreadPerTask,
}

impl fmt::Display for SchedulingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingModel::Bounded { pool_size } => write!(f, "bounded({})", pool_size),
            SchedulingModel::Lightweight => write!(f, "lightweight"),
            SchedulingModel::ThreadPerTask => write!(f, "thread-per-task"),
        }
    }
}

/// Completion counts for one batch, shared by all its tasks.
#[derive(Debug, Default)]
pub struct TaskTally {
    completed: AtomicUsize,
    interrupted: AtomicUsize,
}

impl TaskTally {
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub fn interrupted(&self) -> usize {
        self.interrupted.load(Ordering::Acquire)
    }

    fn record(&self, outcome: WaitOutcome) {
        match outcome {
            WaitOutcome::Elapsed => self.completed.fetch_add(1, Ordering::AcqRel),
            WaitOutcome::Interrupted => self.interrupted.fetch_add(1, Ordering::AcqRel),
        };
    }
}

/// One unit of simulated blocking work.
#[derive(Debug)]
pub struct BlockingTask {
    id: usize,
    duration: Duration,
    token: Arc<CancelToken>,
    tally: Arc<TaskTally>,
}

impl BlockingTask {
    pub fn new(id: usize, duration: Duration, token: Arc<CancelToken>, tally: Arc<TaskTally>) -> Self {
        Self {
            id,
            duration,
            token,
            tally,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Run on the current OS thread, blocking it for the duration.
    pub fn run_blocking(self) -> WaitOutcome {
        let outcome = blocking_sleep(self.duration, &self.token);
        self.finish(outcome)
    }

    /// Run as a green task: the wait parks the task on `timer`.
    pub async fn run_green(self, timer: Arc<TimerDriver>) -> WaitOutcome {
        let outcome = GreenSleep::new(self.duration, timer, self.token.clone()).await;
        self.finish(outcome)
    }

    fn finish(self, outcome: WaitOutcome) -> WaitOutcome {
        if outcome == WaitOutcome::Interrupted {
            trace!(task = self.id, "task interrupted");
        }
        self.tally.record(outcome);
        outcome
    }
}
