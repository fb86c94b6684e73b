//! Cooperative cancellation shared by every simulation task.
//!
//! A [`CancelToken`] is cloned into the controller, the spawner and each
//! vehicle. Cancelling it interrupts cancellable sleeps and wakes every thread
//! blocked in [`Semaphore::acquire`](super::Semaphore::acquire) with that token.

use super::lock;
use crate::error::{SimError, SimResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::error;

/// Something a blocked thread waits on that must be nudged on cancellation.
pub(crate) trait Interrupt: Send + Sync {
    fn interrupt(&self);
}

#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    sleep_lock: Mutex<()>,
    sleep_wakeup: Condvar,
    watched: Mutex<Vec<Arc<dyn Interrupt>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token cancelled and wakes everything waiting on it.
    /// Calling it again is a no-op.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let _guard = lock(&self.inner.sleep_lock);
            self.inner.sleep_wakeup.notify_all();
        }

        // Clone the list so no semaphore lock is taken while holding `watched`.
        let watched: Vec<Arc<dyn Interrupt>> = lock(&self.inner.watched).clone();
        for target in watched {
            target.interrupt();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> SimResult<()> {
        if self.is_cancelled() {
            Err(SimError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `duration` unless cancelled first.
    pub fn sleep(&self, duration: Duration) -> SimResult<()> {
        let deadline = Instant::now() + duration;
        let mut guard = lock(&self.inner.sleep_lock);
        loop {
            if self.is_cancelled() {
                return Err(SimError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            let (next, _) = self
                .inner
                .sleep_wakeup
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            guard = next;
        }
    }

    /// Runs a task body and cancels the token if the body panics or fails
    /// with anything other than `Cancelled`. Peers of a failed task stop
    /// instead of blocking on it forever.
    pub(crate) fn run_or_cancel<T>(&self, task: impl FnOnce() -> SimResult<T>) -> SimResult<T> {
        let _on_panic = CancelOnPanic(self);
        let result = task();
        if let Err(err) = &result {
            if !err.is_cancelled() {
                let current = thread::current();
                let task = current.name().unwrap_or("unnamed");
                error!(task, %err, "task failed; cancelling simulation");
                self.cancel();
            }
        }
        result
    }

    /// Registers `target` to be interrupted on cancellation. Registering the
    /// same target twice keeps a single entry.
    pub(crate) fn watch(&self, target: Arc<dyn Interrupt>) {
        let mut watched = lock(&self.inner.watched);
        let addr = Arc::as_ptr(&target) as *const ();
        if !watched.iter().any(|w| Arc::as_ptr(w) as *const () == addr) {
            watched.push(target);
        }
    }
}

struct CancelOnPanic<'a>(&'a CancelToken);

impl Drop for CancelOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            let current = thread::current();
            let task = current.name().unwrap_or("unnamed");
            error!(task, "task panicked; cancelling simulation");
            self.0.cancel();
        }
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
