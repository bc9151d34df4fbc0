// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Timer driver for green sleeps.
//!
//! One dedicated thread owns a min-heap of deadlines. It sleeps on a
//! condvar until the earliest deadline (or until a new, earlier one is
//! scheduled), then wakes every task whose deadline has passed. Wakers
//! are invoked outside the heap lock.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Condvar, Mutex, PoisonError};
use std::task::Waker;
use std::time::Instant;

use crate::lock;

struct Entry {
    deadline: Instant,
    seq: u64,
    waker: Waker,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.deadline, self.seq).cmp(&(other.deadline, other.seq))
    }
}

struct TimerState {
    heap: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
    shutdown: bool,
}

pub struct TimerDriver {
    state: Mutex<TimerState>,
    changed: Condvar,
}

impl TimerDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TimerState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                shutdown: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Wake `waker` once `deadline` has passed.
    pub fn schedule(&self, deadline: Instant, waker: Waker) {
        let mut state = lock(&self.state);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Reverse(Entry {
            deadline,
            seq,
            waker,
        }));
        self.changed.notify_one();
    }

    /// Deadlines not yet fired.
    pub fn pending(&self) -> usize {
        lock(&self.state).heap.len()
    }

    /// Ask the driver loop to exit. Unfired entries are dropped.
    pub fn request_shutdown(&self) {
        lock(&self.state).shutdown = true;
        self.changed.notify_all();
    }

    /// Fire everything due at `now`. Returns the number of wakers called.
    pub fn fire_due(&self, now: Instant) -> usize {
        let due = {
            let mut state = lock(&self.state);
            take_due(&mut state.heap, now)
        };
        let n = due.len();
        for waker in due {
            waker.wake();
        }
        n
    }

    /// Driver loop; runs on the timer thread until shutdown.
    pub fn run(&self) {
        let mut state = lock(&self.state);
        loop {
            if state.shutdown {
                state.heap.clear();
                return;
            }

            let now = Instant::now();
            let due = take_due(&mut state.heap, now);
            if !due.is_empty() {
                drop(state);
                for waker in due {
                    waker.wake();
                }
                state = lock(&self.state);
                continue;
            }

            let next = state.heap.peek().map(|Reverse(e)| e.deadline);
            state = match next {
                Some(deadline) => {
                    self.changed
                        .wait_timeout(state, deadline.saturating_duration_since(now))
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .changed
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}

impl Default for TimerDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn take_due(heap: &mut BinaryHeap<Reverse<Entry>>, now: Instant) -> Vec<Waker> {
    let mut due = Vec::new();
    while heap.peek().is_some_and(|Reverse(e)| e.deadline <= now) {
        if let Some(Reverse(entry)) = heap.pop() {
            due.push(entry.waker);
        }
    }
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::Wake;
    use std::time::Duration;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting() -> (Arc<CountingWaker>, Waker) {
        let c = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let w = Waker::from(c.clone());
        (c, w)
    }

    #[test]
    fn fires_only_past_deadlines() {
        let timer = TimerDriver::new();
        let base = Instant::now();
        let (early, w1) = counting();
        let (late, w2) = counting();
        timer.schedule(base + Duration::from_millis(10), w1);
        timer.schedule(base + Duration::from_secs(60), w2);

        assert_eq!(timer.fire_due(base), 0);
        assert_eq!(timer.fire_due(base + Duration::from_millis(10)), 1);
        assert_eq!(early.0.load(Ordering::SeqCst), 1);
        assert_eq!(late.0.load(Ordering::SeqCst), 0);
        assert_eq!(timer.pending(), 1);
    }

    #[test]
    fn equal_deadlines_all_fire() {
        let timer = TimerDriver::new();
        let at = Instant::now();
        let (c, w) = counting();
        for _ in 0..3 {
            timer.schedule(at, w.clone());
        }
        assert_eq!(timer.fire_due(at), 3);
        assert_eq!(c.0.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn driver_thread_wakes_on_time() {
        let timer = Arc::new(TimerDriver::new());
        let driver = {
            let timer = timer.clone();
            std::thread::spawn(move || timer.run())
        };
        let (c, w) = counting();
        let start = Instant::now();
        timer.schedule(start + Duration::from_millis(30), w);
        while c.0.load(Ordering::SeqCst) == 0 {
            assert!(start.elapsed() < Duration::from_secs(5), "timer never fired");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(start.elapsed() >= Duration::from_millis(30));
        timer.request_shutdown();
        driver.join().unwrap();
    }

    #[test]
    fn shutdown_with_idle_driver() {
        let timer = Arc::new(TimerDriver::new());
        let driver = {
            let timer = timer.clone();
            std::thread::spawn(move || timer.run())
        };
        std::thread::sleep(Duration::from_millis(5));
        timer.request_shutdown();
        driver.join().unwrap();
    }
}
