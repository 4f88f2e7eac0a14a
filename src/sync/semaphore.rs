//! A counting semaphore built on `Mutex` + `Condvar`.
//!
//! Mirrors the original's `sem` class (`sem_init`/`sem_wait`/`sem_post`):
//! `wait` blocks while the count is zero, `post` increments the count and
//! wakes at most one waiter. `std` has no counting semaphore, so this is
//! hand-built rather than borrowed from a crate — the original's `sem`
//! class exists for the identical reason (POSIX semaphores aren't wrapped
//! by the C++ standard library either).

use std::sync::{Condvar, Mutex};

/// A counting semaphore with blocking `wait`/`post` operations.
#[derive(Debug)]
pub struct Semaphore {
    count: Mutex<usize>,
    condvar: Condvar,
}

impl Semaphore {
    /// Constructs a semaphore with the given initial count.
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            condvar: Condvar::new(),
        }
    }

    /// Blocks until the count is non-zero, then decrements it atomically.
    pub fn wait(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        while *count == 0 {
            count = self
                .condvar
                .wait(count)
                .unwrap_or_else(|e| e.into_inner());
        }
        *count -= 1;
    }

    /// Increments the count and wakes at most one waiter blocked in
    /// [`Semaphore::wait`].
    pub fn post(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count += 1;
        drop(count);
        self.condvar.notify_one();
    }
}

#[cfg(test)]
mod test {
    use super::Semaphore;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_returns_immediately_when_count_is_positive() {
        let sem = Semaphore::new(1);
        sem.wait();
    }

    #[test]
    fn post_wakes_a_blocked_waiter() {
        let sem = Arc::new(Semaphore::new(0));
        let waiter = Arc::clone(&sem);

        let handle = thread::spawn(move || {
            waiter.wait();
        });

        thread::sleep(Duration::from_millis(20));
        sem.post();

        handle.join().expect("waiter thread panicked");
    }

    #[test]
    fn count_decrements_once_per_wait() {
        let sem = Semaphore::new(2);
        sem.wait();
        sem.wait();
        assert_eq!(0, *sem.count.lock().unwrap());
    }
}
