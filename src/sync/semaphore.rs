//! Counting semaphore with Dijkstra's P/V operations.

use super::cancel::{CancelToken, Interrupt};
use super::lock;
use crate::error::{SimError, SimResult};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// A named counting semaphore. Clones share the same count.
#[derive(Clone)]
pub struct Semaphore {
    inner: Arc<SemaphoreInner>,
}

struct SemaphoreInner {
    name: String,
    count: Mutex<usize>,
    available: Condvar,
}

impl Interrupt for SemaphoreInner {
    fn interrupt(&self) {
        // Taking the lock orders this wake-up after any waiter's flag check.
        let _count = lock(&self.count);
        self.available.notify_all();
    }
}

impl Semaphore {
    /// Creates a semaphore holding `initial` permits.
    pub fn new(initial: i64, name: impl Into<String>) -> SimResult<Self> {
        let name = name.into();
        let count = usize::try_from(initial).map_err(|_| {
            SimError::InvalidArgument(format!(
                "semaphore {name}: initial count must be non-negative, got {initial}"
            ))
        })?;
        Ok(Semaphore {
            inner: Arc::new(SemaphoreInner {
                name,
                count: Mutex::new(count),
                available: Condvar::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// P operation. Blocks while no permit is available; returns
    /// `Err(Cancelled)` with the count untouched if `cancel` fires first.
    pub fn acquire(&self, cancel: &CancelToken) -> SimResult<()> {
        let mut count = lock(&self.inner.count);
        cancel.check()?;
        if *count > 0 {
            *count -= 1;
            return Ok(());
        }

        let target: Arc<dyn Interrupt> = self.inner.clone();
        cancel.watch(target);
        trace!(semaphore = %self.inner.name, "waiting for permit");

        loop {
            if cancel.is_cancelled() {
                // A release may have targeted this waiter; hand it on.
                if *count > 0 {
                    self.inner.available.notify_one();
                }
                return Err(SimError::Cancelled);
            }
            if *count > 0 {
                *count -= 1;
                return Ok(());
            }
            count = self
                .inner
                .available
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Takes a permit only if one is available right now.
    pub fn try_acquire(&self) -> bool {
        let mut count = lock(&self.inner.count);
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    /// Acquires a permit owned by the returned guard.
    pub fn acquire_permit(&self, cancel: &CancelToken) -> SimResult<Permit> {
        self.acquire(cancel)?;
        Ok(Permit {
            semaphore: self.clone(),
            released: false,
        })
    }

    /// V operation. Never blocks.
    pub fn release(&self) {
        let mut count = lock(&self.inner.count);
        *count += 1;
        self.inner.available.notify_one();
    }

    /// Best-effort view of the count, for diagnostics only.
    pub fn peek_count(&self) -> usize {
        *lock(&self.inner.count)
    }

    /// Holds the count still. Callers locking several semaphores must use a
    /// fixed order; no task ever holds two counts at once.
    pub(crate) fn count_guard(&self) -> MutexGuard<'_, usize> {
        lock(&self.inner.count)
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore")
            .field("name", &self.inner.name)
            .field("count", &self.peek_count())
            .finish()
    }
}

/// One permit taken from a [`Semaphore`]. Returned to the semaphore exactly
/// once, either through [`Permit::release`] or on drop.
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit {
    semaphore: Semaphore,
    released: bool,
}

impl Permit {
    pub fn semaphore(&self) -> &Semaphore {
        &self.semaphore
    }

    pub fn release(mut self) {
        self.released = true;
        self.semaphore.release();
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if !self.released {
            self.semaphore.release();
        }
    }
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit")
            .field("semaphore", &self.semaphore.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn negative_initial_count_is_rejected() {
        let err = Semaphore::new(-1, "bad").unwrap_err();
        assert!(matches!(err, SimError::InvalidArgument(_)));
    }

    #[test]
    fn zero_initial_count_is_valid_and_blocks() {
        let sem = Semaphore::new(0, "empty").unwrap();
        assert_eq!(sem.peek_count(), 0);
        assert!(!sem.try_acquire());

        let acquired = Arc::new(AtomicBool::new(false));
        let waiter = {
            let sem = sem.clone();
            let acquired = acquired.clone();
            thread::spawn(move || {
                sem.acquire(&CancelToken::new()).unwrap();
                acquired.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));

        sem.release();
        waiter.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert_eq!(sem.peek_count(), 0);
    }

    #[test]
    fn acquire_and_release_move_count_by_one() {
        let sem = Semaphore::new(2, "pair").unwrap();
        let cancel = CancelToken::new();
        sem.acquire(&cancel).unwrap();
        assert_eq!(sem.peek_count(), 1);
        sem.release();
        assert_eq!(sem.peek_count(), 2);
    }

    #[test]
    fn cancelled_acquire_leaves_count_unchanged() {
        let sem = Semaphore::new(0, "light").unwrap();
        let cancel = CancelToken::new();
        let waiter = {
            let sem = sem.clone();
            let cancel = cancel.clone();
            thread::spawn(move || sem.acquire(&cancel))
        };

        thread::sleep(Duration::from_millis(30));
        cancel.cancel();
        assert_eq!(waiter.join().unwrap(), Err(SimError::Cancelled));
        assert_eq!(sem.peek_count(), 0);
    }

    #[test]
    fn acquire_on_cancelled_token_fails_even_with_permits() {
        let sem = Semaphore::new(1, "lane").unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(sem.acquire(&cancel), Err(SimError::Cancelled));
        assert_eq!(sem.peek_count(), 1);
    }

    #[test]
    fn permit_releases_on_drop() {
        let sem = Semaphore::new(1, "lane").unwrap();
        {
            let _permit = sem.acquire_permit(&CancelToken::new()).unwrap();
            assert_eq!(sem.peek_count(), 0);
        }
        assert_eq!(sem.peek_count(), 1);
    }

    #[test]
    fn explicit_permit_release_happens_once() {
        let sem = Semaphore::new(1, "lane").unwrap();
        let permit = sem.acquire_permit(&CancelToken::new()).unwrap();
        permit.release();
        assert_eq!(sem.peek_count(), 1);
    }

    #[test]
    fn mutual_exclusion_with_single_permit() {
        let sem = Semaphore::new(1, "mutex").unwrap();
        let inside = Arc::new(AtomicUsize::new(0));
        let violations = Arc::new(AtomicUsize::new(0));
        let cancel = CancelToken::new();

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let sem = sem.clone();
                let inside = inside.clone();
                let violations = violations.clone();
                let cancel = cancel.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        sem.acquire(&cancel).unwrap();
                        if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                            violations.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                        sem.release();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(violations.load(Ordering::SeqCst), 0);
        assert_eq!(sem.peek_count(), 1);
    }

    #[test]
    fn cancelling_one_waiter_does_not_strand_another() {
        let sem = Semaphore::new(0, "shared").unwrap();
        let doomed = CancelToken::new();
        let patient = CancelToken::new();

        let cancelled_waiter = {
            let sem = sem.clone();
            let doomed = doomed.clone();
            thread::spawn(move || sem.acquire(&doomed))
        };
        let surviving_waiter = {
            let sem = sem.clone();
            let patient = patient.clone();
            thread::spawn(move || sem.acquire(&patient))
        };

        thread::sleep(Duration::from_millis(30));
        doomed.cancel();
        sem.release();

        assert_eq!(cancelled_waiter.join().unwrap(), Err(SimError::Cancelled));
        assert_eq!(surviving_waiter.join().unwrap(), Ok(()));
        assert_eq!(sem.peek_count(), 0);
    }
}
