//! The edge-triggered I/O reactor (C8): accepts connections, drains
//! readable sockets, and hands full read buffers to the worker pool.
//!
//! Every connection is registered one-shot — a single `Interest` that is
//! not renewed until whichever actor currently owns the connection calls
//! `reregister` again. That is the entire mechanism behind the crate's
//! central invariant: a connection is never touched by two actors at
//! once, because neither the reactor nor a worker will see another
//! readiness event for it until they themselves rearm it.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use mio::event::Event;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token, Waker};
use slab::Slab;

use crate::connection::{Connection, Disposition};
use crate::error::ServerError;
use crate::pool::WorkerPool;
use crate::queue::{ConnHandle, TaskQueue};
use crate::Config;

const LISTEN_TOKEN: Token = Token(usize::MAX);
const WAKE_TOKEN: Token = Token(usize::MAX - 1);

/// The single-threaded accept/dispatch loop, owning the connection table
/// and the bounded queue feeding the worker pool.
#[derive(Debug)]
pub struct Reactor {
    poll: Poll,
    listener: TcpListener,
    connections: Slab<ConnHandle>,
    queue: Arc<TaskQueue>,
    closed_rx: Receiver<Token>,
    max_connections: usize,
    open: AtomicUsize,
    high_water_logged: AtomicBool,
    read_buffer_size: usize,
    response_buffer_size: usize,
    // Kept alive only so the worker pool's threads outlive the reactor's
    // own scope; never accessed after construction.
    _pool: WorkerPool,
}

impl Reactor {
    /// Binds `listener`, wires up the bounded task queue and worker pool
    /// described by `config`, and returns a reactor ready to [`run`].
    ///
    /// [`run`]: Reactor::run
    pub fn new(mut listener: TcpListener, config: &Config) -> Result<Self, ServerError> {
        let poll = Poll::new().map_err(ServerError::Reactor)?;
        poll.registry()
            .register(&mut listener, LISTEN_TOKEN, Interest::READABLE)
            .map_err(ServerError::Reactor)?;

        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN).map_err(ServerError::Reactor)?);
        let (closed_tx, closed_rx) = mpsc::channel();

        let queue = Arc::new(TaskQueue::new(config.max_requests));
        let pool = WorkerPool::spawn(
            config.threads,
            Arc::clone(&queue),
            poll.registry(),
            config.doc_root.clone(),
            closed_tx,
            waker,
        )?;

        Ok(Self {
            poll,
            listener,
            connections: Slab::new(),
            queue,
            closed_rx,
            max_connections: config.max_connections,
            open: AtomicUsize::new(0),
            high_water_logged: AtomicBool::new(false),
            read_buffer_size: config.read_buffer_size,
            response_buffer_size: config.response_buffer_size,
            _pool: pool,
        })
    }

    /// Runs the accept/dispatch loop forever, or until `poll` fails for a
    /// reason other than being interrupted.
    pub fn run(&mut self) -> Result<(), ServerError> {
        let mut events = Events::with_capacity(1024);

        loop {
            if let Err(e) = self.poll.poll(&mut events, None) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(ServerError::Reactor(e));
            }

            for event in events.iter() {
                match event.token() {
                    LISTEN_TOKEN => self.accept(),
                    WAKE_TOKEN => self.drain_closed(),
                    token => self.dispatch(token, event),
                }
            }
        }
    }

    fn accept(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => self.admit(stream, addr),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    return;
                }
            }
        }
    }

    fn admit(&mut self, stream: mio::net::TcpStream, addr: SocketAddr) {
        if self.open.load(Ordering::Acquire) >= self.max_connections {
            tracing::debug!(peer = %addr, "refusing connection, at max_connections");
            drop(stream);
            return;
        }

        let entry = self.connections.vacant_entry();
        let token = Token(entry.key());
        let mut conn = Connection::new(
            stream,
            addr,
            token,
            self.read_buffer_size,
            self.response_buffer_size,
        );

        if let Err(e) = conn.register(self.poll.registry()) {
            tracing::warn!(peer = %addr, error = %e, "failed to register connection");
            return;
        }

        let open = self.open.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(peer = %addr, open, "accepted connection");
        entry.insert(Arc::new(std::sync::Mutex::new(conn)));

        if open * 10 >= self.max_connections * 9
            && self
                .high_water_logged
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            tracing::warn!(
                open,
                max_connections = self.max_connections,
                "connection table reached 90% of its capacity"
            );
        }
    }

    fn drain_closed(&mut self) {
        while let Ok(token) = self.closed_rx.try_recv() {
            self.forget(token);
        }
    }

    fn dispatch(&mut self, token: Token, event: &Event) {
        let Some(conn) = self.connections.get(token.0) else {
            return;
        };
        let conn = Arc::clone(conn);

        if event.is_error() || (event.is_read_closed() && event.is_write_closed()) {
            let mut guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            guard.close(self.poll.registry());
            drop(guard);
            self.forget(token);
            return;
        }

        if event.is_readable() {
            let mut guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            let mut read_result = guard.read();
            if read_result.is_ok() {
                // Deregister before handoff: the read drained the socket to
                // `WouldBlock`, and leaving it armed would let a readable
                // edge for new bytes reach the reactor again while a worker
                // still owns this connection, queuing it twice over.
                read_result = guard.deregister_for_handoff(self.poll.registry());
            }
            drop(guard);

            match read_result {
                Ok(()) => match self.queue.append(Arc::clone(&conn)) {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!("task queue full, refusing connection");
                        self.close_now(token, &conn);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "task queue mutex poisoned");
                        self.close_now(token, &conn);
                    }
                },
                Err(_) => self.close_now(token, &conn),
            }
        }

        if event.is_writable() {
            let mut guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            let disposition = guard.write(self.poll.registry());
            drop(guard);
            if disposition == Disposition::Closed {
                self.forget(token);
            }
        }
    }

    fn close_now(&mut self, token: Token, conn: &ConnHandle) {
        let mut guard = conn.lock().unwrap_or_else(|e| e.into_inner());
        guard.close(self.poll.registry());
        drop(guard);
        self.forget(token);
    }

    fn forget(&mut self, token: Token) {
        if self.connections.try_remove(token.0).is_some() {
            let open = self.open.fetch_sub(1, Ordering::AcqRel) - 1;
            tracing::info!(open, "closed connection");
        }
    }
}
