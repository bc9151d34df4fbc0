// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Interruptible waits.
//!
//! `blocking_sleep` parks the calling OS thread. `GreenSleep` is the same
//! wait as a future: it arms the green runtime's timer and parks the task,
//! leaving the worker thread free. Both end early on cancellation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::green::timer::TimerDriver;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full duration passed.
    Elapsed,
    /// The token was cancelled first. The token stays cancelled.
    Interrupted,
}

/// Block the current thread for `duration` unless `token` is cancelled.
pub fn blocking_sleep(duration: Duration, token: &CancelToken) -> WaitOutcome {
    token.wait_timeout(duration)
}

/// Future that resolves after a deadline or on cancellation.
pub struct GreenSleep {
    deadline: Instant,
    timer: Arc<TimerDriver>,
    token: Arc<CancelToken>,
    armed: bool,
    cancel_key: Option<u64>,
}

impl GreenSleep {
    pub fn new(duration: Duration, timer: Arc<TimerDriver>, token: Arc<CancelToken>) -> Self {
        Self {
            deadline: Instant::now() + duration,
            timer,
            token,
            armed: false,
            cancel_key: None,
        }
    }
}

impl Future for GreenSleep {
    type Output = WaitOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<WaitOutcome> {
        let this = self.get_mut();

        if this.token.is_cancelled() {
            return Poll::Ready(WaitOutcome::Interrupted);
        }
        if Instant::now() >= this.deadline {
            return Poll::Ready(WaitOutcome::Elapsed);
        }

        if !this.armed {
            this.armed = true;
            this.timer.schedule(this.deadline, cx.waker().clone());
            // A cancel racing with this registration wakes us right away.
            this.cancel_key = this.token.register(cx.waker());
        }
        Poll::Pending
    }
}

impl Drop for GreenSleep {
    fn drop(&mut self) {
        if let Some(key) = self.cancel_key.take() {
            self.token.deregister(key);
        }
    }
}
