// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Harness errors.
//!
//! Interruption is not an error: it is reported through `WaitOutcome` and
//! the run's tally. What remains are configuration mistakes and the OS
//! refusing us threads.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// A bounded pool was requested with zero workers.
    #[error("worker pool needs at least one worker")]
    InvalidPoolSize,

    /// The OS refused to create a thread.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// A worker or task thread panicked.
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),

    /// Work was submitted after the executor stopped accepting it.
    #[error("executor is shut down")]
    Closed,
}

/// Best-effort message from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
