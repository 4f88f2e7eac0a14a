//! The bounded task queue (C2): a FIFO of connections with bytes waiting
//! to be parsed, handed from the reactor thread to the worker pool.
//!
//! Built directly on [`crate::sync::Mutex`] + [`crate::sync::Semaphore`]
//! rather than a channel crate: `append` takes the mutex only long enough
//! to push and check capacity, then posts the semaphore outside the lock;
//! `take` waits on the semaphore before taking the mutex, so a worker
//! never spins on an empty queue.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::connection::Connection;
use crate::error::ServerError;
use crate::sync::{Mutex, Semaphore};

/// A queue entry: a connection whose read buffer holds bytes awaiting
/// parsing, shared between whichever thread currently owns it.
pub type ConnHandle = Arc<std::sync::Mutex<Connection>>;

/// A bounded, multi-producer multi-consumer FIFO of connection handles.
#[derive(Debug)]
pub struct TaskQueue {
    items: Mutex<VecDeque<ConnHandle>>,
    slots: Semaphore,
    capacity: usize,
}

impl TaskQueue {
    /// Constructs a queue that refuses pushes once it holds `capacity`
    /// entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            slots: Semaphore::new(0),
            capacity,
        }
    }

    /// Appends `conn`, returning `false` without blocking if the queue is
    /// already at capacity — the caller is expected to close the
    /// connection rather than buffer requests without bound (§4.2).
    pub fn append(&self, conn: ConnHandle) -> Result<bool, ServerError> {
        let mut items = self.items.lock()?;
        if items.len() >= self.capacity {
            return Ok(false);
        }
        items.push_back(conn);
        drop(items);
        self.slots.post();
        Ok(true)
    }

    /// Blocks until an entry is available, then removes and returns it.
    pub fn take(&self) -> Result<ConnHandle, ServerError> {
        loop {
            self.slots.wait();
            let mut items = self.items.lock()?;
            if let Some(conn) = items.pop_front() {
                return Ok(conn);
            }
            // Spurious wakeup with nothing queued: loop back and wait again.
        }
    }

    /// Number of entries currently queued, for diagnostics.
    pub fn len(&self) -> Result<usize, ServerError> {
        Ok(self.items.lock()?.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mio::net::TcpStream;
    use mio::Token;
    use std::net::TcpListener as StdTcpListener;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn handle() -> ConnHandle {
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::net::TcpStream::connect(addr).unwrap();
        let (server, peer) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        drop(client);
        Arc::new(std::sync::Mutex::new(Connection::new(
            TcpStream::from_std(server),
            peer,
            Token(0),
            64,
            64,
        )))
    }

    #[test]
    fn append_respects_capacity() {
        let queue = TaskQueue::new(1);
        assert!(queue.append(handle()).unwrap());
        assert!(!queue.append(handle()).unwrap());
    }

    #[test]
    fn take_blocks_until_an_item_is_appended() {
        let queue = Arc::new(TaskQueue::new(4));
        let taker = Arc::clone(&queue);

        let join = thread::spawn(move || taker.take().unwrap());

        thread::sleep(Duration::from_millis(20));
        queue.append(handle()).unwrap();

        join.join().expect("taker thread panicked");
    }

    #[test]
    fn fifo_order_is_preserved() {
        let queue = TaskQueue::new(4);
        let a = handle();
        let b = handle();
        let a_token = a.lock().unwrap().token();
        queue.append(a).unwrap();
        queue.append(b).unwrap();

        let first = queue.take().unwrap();
        assert_eq!(a_token, first.lock().unwrap().token());
    }
}
