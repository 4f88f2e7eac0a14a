//! Synchronization primitives used by the bounded task queue.
//!
//! The original design wraps `pthread_mutex_t`/`sem_t`/`pthread_cond_t` in
//! small RAII classes (`locker`, `sem`, `cond`) so that every acquisition
//! releases on every exit path. In Rust, `std::sync::Mutex` already gives
//! us that scoped-release guarantee via its guard's `Drop` impl, so
//! [`Mutex`] here is a thin wrapper that turns lock poisoning into a fatal
//! [`ServerError`](crate::error::ServerError) instead of silently
//! unwrapping it. [`Semaphore`] has no `std` equivalent and is hand-built
//! on top of `Mutex` + `Condvar`, exactly as the original builds `sem` on
//! top of a kernel primitive that also doesn't exist as a library type.

mod semaphore;

pub use semaphore::Semaphore;

use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};

use crate::error::ServerError;

/// A mutex whose poisoning is surfaced as a [`ServerError`] rather than a
/// panic, matching the original's "mutex construction may fail" contract
/// even though `Mutex::new` itself cannot fail in `std`.
#[derive(Debug, Default)]
pub struct Mutex<T> {
    inner: StdMutex<T>,
}

impl<T> Mutex<T> {
    /// Constructs a new mutex guarding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: StdMutex::new(value),
        }
    }

    /// Acquires the lock, blocking until it is available.
    ///
    /// # Errors
    /// Returns [`ServerError::InitError`] if a prior holder panicked while
    /// holding the lock, poisoning it. There is no safe way to recover the
    /// guarded state at that point, so this is treated as a fatal
    /// infrastructure error upstream.
    pub fn lock(&self) -> Result<MutexGuard<'_, T>, ServerError> {
        self.inner
            .lock()
            .map_err(|e: PoisonError<_>| ServerError::InitError(e.to_string()))
    }
}
