pub mod cancel;
pub mod semaphore;

pub use cancel::CancelToken;
pub use semaphore::{Permit, Semaphore};

use std::sync::{Mutex, MutexGuard, PoisonError};

// Every value guarded in this crate is a plain counter or list, so a panic on
// another thread cannot leave it half-updated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
