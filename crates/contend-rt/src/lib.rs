// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Task-scheduling harness.
//!
//! Runs a batch of simulated blocking tasks under different scheduling
//! models and measures wall-clock completion:
//!
//! - bounded: fixed pool of OS worker threads; extra tasks queue
//! - green: M:N stackless tasks; a waiting task parks, its worker doesn't
//! - thread: one OS thread per task
//!
//! Components:
//! - cancel: cooperative cancellation token with wakeable waiters
//! - sleep: interruptible waits (thread-blocking and green)
//! - work: the simulated task and its tally
//! - spawner: the "spawn a concurrent unit" seam
//! - pool / thread / green: the three `Spawner` implementations
//! - harness: runs a batch on a spawner and reports a `TaskResult`

pub mod cancel;
pub mod config;
pub mod error;
pub mod green;
pub mod harness;
pub mod pool;
pub mod sleep;
pub mod spawner;
pub mod thread;
pub mod work;

pub use cancel::CancelToken;
pub use config::HarnessConfig;
pub use error::HarnessError;
pub use green::GreenRuntime;
pub use harness::{Harness, TaskResult};
pub use pool::WorkerPool;
pub use sleep::WaitOutcome;
pub use spawner::Spawner;
pub use thread::ThreadPerTask;
pub use work::{BlockingTask, SchedulingModel, TaskTally};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// None of the guarded state here can be left half-updated by a panic,
/// so poison carries no information worth propagating.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
