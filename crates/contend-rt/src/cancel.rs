// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Cooperative cancellation.
//!
//! An AtomicBool flag that never resets once set, plus two ways for a
//! waiter to be woken when it flips: OS threads park on a condvar, green
//! tasks register a `Waker`. The flag stays set after waiters wake so an
//! enclosing supervisor can still see the request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::task::Waker;
use std::time::{Duration, Instant};

use crate::lock;
use crate::sleep::WaitOutcome;

/// Cancellation token shared between a supervisor and its tasks.
#[derive(Debug)]
pub struct CancelToken {
    flag: AtomicBool,
    wakers: Mutex<HashMap<u64, Waker>>,
    parked: Condvar,
    next_key: AtomicU64,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
            wakers: Mutex::new(HashMap::new()),
            parked: Condvar::new(),
            next_key: AtomicU64::new(0),
        }
    }

    /// Set the flag and wake every waiter.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);

        // Wake outside the lock: a waker may re-enter the scheduler.
        let woken: Vec<Waker> = {
            let mut wakers = lock(&self.wakers);
            self.parked.notify_all();
            wakers.drain().map(|(_, w)| w).collect()
        };
        for waker in woken {
            waker.wake();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Block the current OS thread for `duration`, returning early if the
    /// token is cancelled.
    pub fn wait_timeout(&self, duration: Duration) -> WaitOutcome {
        let deadline = Instant::now() + duration;
        let mut guard = lock(&self.wakers);
        loop {
            // Checked under the lock: `cancel` notifies while holding it,
            // so the flag cannot flip between this check and the wait.
            if self.is_cancelled() {
                return WaitOutcome::Interrupted;
            }
            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::Elapsed;
            }
            guard = match self.parked.wait_timeout(guard, deadline - now) {
                Ok((g, _)) => g,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Register a waker to be called on cancellation.
    ///
    /// Returns `None` and wakes immediately if the token is already
    /// cancelled. Otherwise returns a key for `deregister`.
    pub(crate) fn register(&self, waker: &Waker) -> Option<u64> {
        let mut wakers = lock(&self.wakers);
        if self.is_cancelled() {
            drop(wakers);
            waker.wake_by_ref();
            return None;
        }
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        wakers.insert(key, waker.clone());
        Some(key)
    }

    pub(crate) fn deregister(&self, key: u64) {
        lock(&self.wakers).remove(&key);
    }

    /// Number of green waiters currently registered.
    pub fn waiter_count(&self) -> usize {
        lock(&self.wakers).len()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::task::Wake;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn starts_uncancelled() {
        let t = CancelToken::new();
        assert!(!t.is_cancelled());
    }

    #[test]
    fn cancel_is_sticky() {
        let t = CancelToken::new();
        t.cancel();
        assert!(t.is_cancelled());
        t.cancel();
        assert!(t.is_cancelled());
    }

    #[test]
    fn wait_elapses_without_cancel() {
        let t = CancelToken::new();
        let start = Instant::now();
        assert_eq!(t.wait_timeout(Duration::from_millis(20)), WaitOutcome::Elapsed);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn wait_returns_immediately_when_already_cancelled() {
        let t = CancelToken::new();
        t.cancel();
        let start = Instant::now();
        assert_eq!(t.wait_timeout(Duration::from_secs(5)), WaitOutcome::Interrupted);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn cancel_wakes_parked_thread() {
        let t = Arc::new(CancelToken::new());
        let waiter = {
            let t = t.clone();
            std::thread::spawn(move || t.wait_timeout(Duration::from_secs(10)))
        };
        std::thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        t.cancel();
        assert_eq!(waiter.join().unwrap(), WaitOutcome::Interrupted);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn cancel_wakes_registered_wakers_once() {
        let t = CancelToken::new();
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(counter.clone());
        assert!(t.register(&waker).is_some());
        assert_eq!(t.waiter_count(), 1);
        t.cancel();
        t.cancel();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(t.waiter_count(), 0);
    }

    #[test]
    fn register_after_cancel_wakes_immediately() {
        let t = CancelToken::new();
        t.cancel();
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(counter.clone());
        assert!(t.register(&waker).is_none());
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deregister_drops_waker() {
        let t = CancelToken::new();
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let key = t.register(&Waker::from(counter.clone())).unwrap();
        t.deregister(key);
        t.cancel();
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }
}
