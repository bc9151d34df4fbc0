// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Green task representation.
//!
//! A task is a boxed future plus an atomic state word. The scheduler owns
//! the polling loop; wakers flip the state and re-enqueue.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};

use crate::lock;

/// Task lifecycle states.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Queued, waiting to be polled. Also set by a wake that lands while
    /// the task is running, which tells the worker to requeue it.
    Ready = 0,
    /// Currently being polled by a worker.
    Running = 1,
    /// Parked on a timer or cancellation, waiting for its waker.
    Waiting = 2,
    Complete = 3,
}

impl TaskState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Ready,
            1 => Self::Running,
            2 => Self::Waiting,
            _ => Self::Complete,
        }
    }
}

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Re-enqueue callback installed by the scheduler.
pub(crate) type ScheduleFn = Arc<dyn Fn(Arc<RawTask>) + Send + Sync>;

pub(crate) struct RawTask {
    pub id: u64,
    state: AtomicU8,
    future: Mutex<Option<BoxFuture>>,
    schedule_fn: Mutex<Option<ScheduleFn>>,
}

impl std::fmt::Debug for RawTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawTask")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl RawTask {
    pub fn new(id: u64, future: BoxFuture) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: AtomicU8::new(TaskState::Ready as u8),
            future: Mutex::new(Some(future)),
            schedule_fn: Mutex::new(None),
        })
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_schedule_fn(&self, f: ScheduleFn) {
        *lock(&self.schedule_fn) = Some(f);
    }

    /// Claim the task for polling.
    pub fn start_running(&self) {
        self.state.store(TaskState::Running as u8, Ordering::Release);
    }

    /// After a `Pending` poll: park the task. Returns false if a wake
    /// arrived during the poll, in which case the caller must requeue.
    pub fn park(&self) -> bool {
        self.state
            .compare_exchange(
                TaskState::Running as u8,
                TaskState::Waiting as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Mark complete and release the schedule callback, which holds the
    /// scheduler's shared state alive.
    pub fn mark_complete(&self) {
        self.state.store(TaskState::Complete as u8, Ordering::Release);
        *lock(&self.schedule_fn) = None;
    }

    /// Poll the future once. Returns true if the task completed.
    pub fn poll(self: &Arc<Self>) -> bool {
        let waker = Waker::from(Arc::new(TaskWaker { task: self.clone() }));
        let mut cx = Context::from_waker(&waker);

        let mut slot = lock(&self.future);
        let Some(fut) = slot.as_mut() else {
            return true;
        };

        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                *slot = None;
                true
            }
            Poll::Pending => false,
        }
    }

    fn reschedule(self: &Arc<Self>) {
        let f = lock(&self.schedule_fn).clone();
        if let Some(f) = f {
            f(self.clone());
        }
    }
}

/// Waker that moves a parked task back to the run queue.
struct TaskWaker {
    task: Arc<RawTask>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        let state = &self.task.state;
        let mut current = state.load(Ordering::Acquire);
        loop {
            match TaskState::from_u8(current) {
                TaskState::Waiting => {
                    match state.compare_exchange(
                        current,
                        TaskState::Ready as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => {
                            self.task.reschedule();
                            return;
                        }
                        Err(actual) => current = actual,
                    }
                }
                TaskState::Running => {
                    // The polling worker sees Ready when it tries to park
                    // and requeues the task itself.
                    match state.compare_exchange(
                        current,
                        TaskState::Ready as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => return,
                        Err(actual) => current = actual,
                    }
                }
                TaskState::Ready | TaskState::Complete => return,
            }
        }
    }
}
