// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! M:N work-stealing scheduler.
//!
//! N worker threads each own a local queue. When idle, workers pull a
//! batch from the global injector or steal from a random peer, and park
//! on a condvar when there is nothing to do. A separate timer thread
//! wakes sleeping tasks.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::queue::{InjectorQueue, LocalQueue};
use super::task::{RawTask, TaskState};
use super::timer::TimerDriver;
use crate::error::HarnessError;
use crate::lock;

/// Tasks taken from the injector in one go.
const INJECT_BATCH: usize = 32;

/// Idle workers re-check for steals this often.
const PARK_TIMEOUT: Duration = Duration::from_millis(5);

/// Owns worker threads, the run queues and the timer driver. Shutting
/// down waits for every scheduled task to complete.
pub struct Scheduler {
    threads: Mutex<Vec<JoinHandle<()>>>,
    shared: Arc<SharedState>,
}

/// State shared between workers, the timer thread and spawners.
pub(crate) struct SharedState {
    local_queues: Vec<LocalQueue>,
    global_queue: InjectorQueue,
    timer: Arc<TimerDriver>,
    /// Scheduled and not yet complete.
    active_tasks: AtomicUsize,
    all_done: (Mutex<()>, Condvar),
    shutdown: AtomicBool,
    worker_count: usize,
    work_available: (Mutex<bool>, Condvar),
    polls: AtomicU64,
    panicked: AtomicUsize,
}

impl Scheduler {
    /// Start `n` workers plus the timer thread. `n == 0` means one worker
    /// per available core.
    pub fn new(n: usize) -> Result<Self, HarnessError> {
        let worker_count = if n == 0 {
            thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
        } else {
            n
        };

        let shared = Arc::new(SharedState {
            local_queues: (0..worker_count).map(|_| LocalQueue::new()).collect(),
            global_queue: InjectorQueue::new(),
            timer: Arc::new(TimerDriver::new()),
            active_tasks: AtomicUsize::new(0),
            all_done: (Mutex::new(()), Condvar::new()),
            shutdown: AtomicBool::new(false),
            worker_count,
            work_available: (Mutex::new(false), Condvar::new()),
            polls: AtomicU64::new(0),
            panicked: AtomicUsize::new(0),
        });

        let sched = Self {
            threads: Mutex::new(Vec::with_capacity(worker_count + 1)),
            shared,
        };

        let timer = sched.shared.timer.clone();
        sched.start_thread("contend-timer".to_string(), move || timer.run())?;

        for id in 0..worker_count {
            let shared = sched.shared.clone();
            sched.start_thread(format!("contend-green-{}", id), move || {
                worker_loop(id, &shared)
            })?;
        }

        debug!(workers = worker_count, "green scheduler started");
        Ok(sched)
    }

    /// On failure `new` drops the half-built scheduler, which stops the
    /// threads already running.
    fn start_thread<F>(&self, name: String, f: F) -> Result<(), HarnessError>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new().name(name).spawn(f)?;
        lock(&self.threads).push(handle);
        Ok(())
    }

    /// Queue a new task and install its re-enqueue callback.
    pub(crate) fn schedule(&self, task: Arc<RawTask>) {
        self.shared.active_tasks.fetch_add(1, Ordering::AcqRel);

        let shared = Arc::downgrade(&self.shared);
        task.set_schedule_fn(Arc::new(move |t: Arc<RawTask>| {
            if let Some(shared) = shared.upgrade() {
                inject_task(&shared, t);
            }
        }));

        inject_task(&self.shared, task);
    }

    pub fn timer(&self) -> &Arc<TimerDriver> {
        &self.shared.timer
    }

    pub fn worker_count(&self) -> usize {
        self.shared.worker_count
    }

    /// Scheduled tasks that have not completed.
    pub fn active_tasks(&self) -> usize {
        self.shared.active_tasks.load(Ordering::Acquire)
    }

    /// Tasks sitting in run queues, not counting parked ones.
    pub fn queued(&self) -> usize {
        self.shared.global_queue.len()
            + self.shared.local_queues.iter().map(LocalQueue::len).sum::<usize>()
    }

    /// Total polls performed across all workers.
    pub fn polls(&self) -> u64 {
        self.shared.polls.load(Ordering::Relaxed)
    }

    /// Tasks whose poll panicked.
    pub fn panicked(&self) -> usize {
        self.shared.panicked.load(Ordering::Acquire)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Wait for every scheduled task to complete, then stop the workers
    /// and the timer.
    pub fn shutdown(&self) {
        {
            let (mutex, cvar) = &self.shared.all_done;
            let mut guard = lock(mutex);
            while self.shared.active_tasks.load(Ordering::Acquire) > 0 {
                guard = cvar.wait(guard).unwrap_or_else(PoisonError::into_inner);
            }
        }
        self.stop_threads();
    }

    fn stop_threads(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.timer.request_shutdown();
        notify_workers(&self.shared, true);

        let handles: Vec<_> = lock(&self.threads).drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
        debug!(polls = self.polls(), "green scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if !self.is_shut_down() {
            self.shutdown();
        }
    }
}

fn inject_task(shared: &SharedState, task: Arc<RawTask>) {
    shared.global_queue.push(task);
    notify_workers(shared, false);
}

fn notify_workers(shared: &SharedState, all: bool) {
    let (mutex, cvar) = &shared.work_available;
    let mut ready = lock(mutex);
    *ready = true;
    if all {
        cvar.notify_all();
    } else {
        cvar.notify_one();
    }
}

/// Simple xorshift64 for random victim selection.
fn xorshift64(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}

fn worker_loop(id: usize, shared: &SharedState) {
    let local = &shared.local_queues[id];
    let mut rng = (id as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);

    loop {
        // 1. Local queue.
        if let Some(task) = local.pop() {
            run_task(task, shared);
            continue;
        }

        // 2. Global injector, keeping the surplus locally for peers to steal.
        let mut batch = shared.global_queue.pop_batch(INJECT_BATCH).into_iter();
        if let Some(first) = batch.next() {
            for task in batch {
                if let Err(task) = local.push(task) {
                    shared.global_queue.push(task);
                }
            }
            run_task(first, shared);
            continue;
        }

        // 3. Steal from a random peer.
        if shared.worker_count > 1 {
            let victim = (xorshift64(&mut rng) as usize) % shared.worker_count;
            if victim != id {
                let mut stolen = shared.local_queues[victim].steal_batch().into_iter();
                if let Some(first) = stolen.next() {
                    for task in stolen {
                        if let Err(task) = local.push(task) {
                            shared.global_queue.push(task);
                        }
                    }
                    run_task(first, shared);
                    continue;
                }
            }
        }

        // 4. Exit once shutdown is requested and our queue is empty.
        if shared.shutdown.load(Ordering::Acquire) {
            while let Some(task) = local.pop() {
                run_task(task, shared);
            }
            break;
        }

        // 5. Park until new work arrives.
        let (mutex, cvar) = &shared.work_available;
        let mut ready = lock(mutex);
        if *ready || !shared.global_queue.is_empty() || !local.is_empty() {
            *ready = false;
            continue;
        }
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        ready = cvar
            .wait_timeout(ready, PARK_TIMEOUT)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
        *ready = false;
    }
}

/// Poll a task once and route it: complete, park, or requeue.
fn run_task(task: Arc<RawTask>, shared: &SharedState) {
    if task.state() == TaskState::Complete {
        return;
    }

    task.start_running();
    shared.polls.fetch_add(1, Ordering::Relaxed);

    let completed = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| task.poll())) {
        Ok(done) => done,
        Err(_) => {
            warn!(task = task.id, "green task panicked");
            shared.panicked.fetch_add(1, Ordering::AcqRel);
            true
        }
    };

    if completed {
        task.mark_complete();
        if shared.active_tasks.fetch_sub(1, Ordering::AcqRel) == 1 {
            let (mutex, cvar) = &shared.all_done;
            let _guard = lock(mutex);
            cvar.notify_all();
        }
    } else if !task.park() {
        // Woken while we were polling it.
        inject_task(shared, task);
    }
}
