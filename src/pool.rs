//! The bounded worker thread pool (C3): a fixed number of threads that
//! pull connections off the task queue, drive the parser and response
//! assembler, and rearm the reactor themselves before looping back for
//! the next item.
//!
//! Threads are spawned once at startup and run until the process exits;
//! there is no graceful shutdown path, matching the original design,
//! which has no stop signal either — the task queue simply outlives every
//! request it was ever asked to carry.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use mio::{Registry, Token, Waker};

use crate::connection::Disposition;
use crate::error::ServerError;
use crate::queue::TaskQueue;

/// A running pool of worker threads, kept alive for the life of the
/// process.
#[derive(Debug)]
pub struct WorkerPool {
    _handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `thread_count` workers, each holding its own clone of
    /// `registry` so it can rearm connections without contending with the
    /// reactor thread or other workers for it.
    pub fn spawn(
        thread_count: usize,
        queue: Arc<TaskQueue>,
        registry: &Registry,
        doc_root: PathBuf,
        closed_tx: Sender<Token>,
        waker: Arc<Waker>,
    ) -> Result<Self, ServerError> {
        let mut handles = Vec::with_capacity(thread_count);

        for id in 0..thread_count {
            let queue = Arc::clone(&queue);
            let registry = registry.try_clone().map_err(ServerError::Reactor)?;
            let doc_root = doc_root.clone();
            let closed_tx = closed_tx.clone();
            let waker = Arc::clone(&waker);

            let handle = thread::Builder::new()
                .name(format!("edgeserve-worker-{id}"))
                .spawn(move || worker_loop(queue, registry, doc_root, closed_tx, waker))
                .map_err(ServerError::ThreadSpawn)?;

            handles.push(handle);
        }

        Ok(Self { _handles: handles })
    }
}

fn worker_loop(
    queue: Arc<TaskQueue>,
    registry: Registry,
    doc_root: PathBuf,
    closed_tx: Sender<Token>,
    waker: Arc<Waker>,
) {
    loop {
        let conn = match queue.take() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "task queue mutex poisoned, worker exiting");
                return;
            }
        };

        let mut guard = conn.lock().unwrap_or_else(|e| e.into_inner());
        let token = guard.token();
        let disposition = guard.process(&doc_root, &registry);
        drop(guard);

        if disposition == Disposition::Closed {
            let _ = closed_tx.send(token);
            let _ = waker.wake();
        }
    }
}
