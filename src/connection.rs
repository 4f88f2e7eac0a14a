//! A single client connection (§4.4): the socket, its read/response
//! buffers, incremental parser state, and (while a file response is in
//! flight) the memory-mapped file being streamed out.
//!
//! A `Connection` is always owned by exactly one actor at a time — the
//! reactor thread or a single worker thread — which [`Connection::read`],
//! [`Connection::process`], and [`Connection::write`] rely on implicitly:
//! none of them take a lock, because the one-shot reactor registration
//! already guarantees no other actor is touching this connection
//! concurrently.

use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::Path;

use mio::net::TcpStream;
use mio::{Interest, Registry, Token};
use socket2::SockRef;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::parser::request::{ParseProgress, RequestParser};
use crate::resource::{self, FileMap, ResourceOutcome};
use crate::response::{self, Status};
use crate::writer::{self, TransmitPlan};

/// What a connection needs the reactor to do next after
/// [`Connection::read`], [`Connection::process`], or [`Connection::write`]
/// returns.
#[derive(Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Rearmed for another readable event.
    AwaitingRead,
    /// Rearmed for another writable event.
    AwaitingWrite,
    /// Deregistered; the caller should free this connection's slot.
    Closed,
}

/// A single accepted TCP connection and all per-request state associated
/// with it.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    addr: SocketAddr,
    token: Token,
    read_buf: ReadBuffer,
    parser: RequestParser,
    write_buf: WriteBuffer,
    file: Option<FileMap>,
    transmit: TransmitPlan,
    keep_alive: bool,
    closed: bool,
    registered: bool,
}

/// Access logging for a response outcome: 2xx/4xx at `debug`, 5xx at `warn`.
fn log_outcome(peer: SocketAddr, status: Status) {
    let code = status.code();
    if code >= 500 {
        tracing::warn!(peer = %peer, status = code, "server error response");
    } else {
        tracing::debug!(peer = %peer, status = code, "request handled");
    }
}

impl Connection {
    /// Wraps a freshly accepted stream, ready to be registered with a
    /// reactor.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        token: Token,
        read_buffer_size: usize,
        response_buffer_size: usize,
    ) -> Self {
        Self {
            stream,
            addr,
            token,
            read_buf: ReadBuffer::new(read_buffer_size),
            parser: RequestParser::new(),
            write_buf: WriteBuffer::new(response_buffer_size),
            file: None,
            transmit: TransmitPlan::default(),
            keep_alive: false,
            closed: false,
            registered: false,
        }
    }

    /// The reactor token this connection is registered under.
    pub fn token(&self) -> Token {
        self.token
    }

    /// The peer address, for logging.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Registers the connection for its first readable event.
    ///
    /// Sets `SO_REUSEADDR` on the accepted socket first, matching the
    /// per-connection setup the original server performs in its own
    /// `init` (§4.4).
    pub fn register(&mut self, registry: &Registry) -> io::Result<()> {
        SockRef::from(&self.stream).set_reuse_address(true)?;
        registry.register(&mut self.stream, self.token, Interest::READABLE)?;
        self.registered = true;
        Ok(())
    }

    /// Deregisters the socket so it stops generating readiness events while
    /// a worker owns it.
    ///
    /// The reactor calls this right after a successful [`Connection::read`]
    /// and before handing the connection to the task queue. Without it, the
    /// read drains the socket to `WouldBlock` (a not-ready state) and new
    /// bytes arriving before a worker dequeues the connection would trigger
    /// a second readable edge for the same token, handing the same
    /// connection to the queue twice and breaking the single-owner
    /// invariant this crate otherwise enforces structurally. [`process`]
    /// and [`write`] re-arm via [`Connection::reregister_read`]/
    /// [`Connection::reregister_write`] once whichever actor owns the
    /// connection is ready to hand it back to the reactor.
    ///
    /// [`process`]: Connection::process
    /// [`write`]: Connection::write
    pub fn deregister_for_handoff(&mut self, registry: &Registry) -> io::Result<()> {
        registry.deregister(&mut self.stream)?;
        self.registered = false;
        Ok(())
    }

    /// Drains the socket into the read buffer until it would block.
    ///
    /// A read that arrives with the buffer already full, or a read
    /// reporting peer shutdown (`Ok(0)`), is treated as a failure — the
    /// caller closes the connection in either case (§4.4, §9: a client
    /// sending a request too large for the fixed read buffer is refused,
    /// not buffered without bound).
    pub fn read(&mut self) -> io::Result<()> {
        loop {
            if self.read_buf.is_full() {
                return Err(io::Error::new(
                    io::ErrorKind::OutOfMemory,
                    "request exceeded the fixed read buffer",
                ));
            }

            match self.stream.read(self.read_buf.spare_capacity()) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "peer closed the connection",
                    ))
                }
                Ok(n) => self.read_buf.advance_read(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Drives the parser over whatever bytes are buffered, resolves the
    /// request against `doc_root` once it's complete, assembles a
    /// response, and attempts to write it immediately — rearming the
    /// reactor for whichever direction the connection needs next.
    pub fn process(&mut self, doc_root: &Path, registry: &Registry) -> Disposition {
        match self.parser.advance(&mut self.read_buf) {
            ParseProgress::NeedMore => match self.reregister_read(registry) {
                Ok(()) => Disposition::AwaitingRead,
                Err(_) => self.force_close(registry),
            },
            ParseProgress::BadRequest => {
                tracing::debug!(peer = %self.addr, "rejecting malformed request");
                self.respond(Status::BadRequest, None, registry)
            }
            ParseProgress::Complete => {
                let target = &self.read_buf.filled()[self.parser.request.target.clone()];
                match resource::resolve(doc_root, target) {
                    ResourceOutcome::BadRequest => self.respond(Status::BadRequest, None, registry),
                    ResourceOutcome::NoResource => self.respond(Status::NotFound, None, registry),
                    ResourceOutcome::Forbidden => self.respond(Status::Forbidden, None, registry),
                    ResourceOutcome::File(map) => self.respond(Status::Ok, Some(map), registry),
                }
            }
        }
    }

    fn respond(&mut self, status: Status, file: Option<FileMap>, registry: &Registry) -> Disposition {
        let keep_alive = self.parser.request.keep_alive;
        log_outcome(self.addr, status);
        match response::assemble(&mut self.write_buf, status, keep_alive, file.as_ref()) {
            Ok((headers_len, body_len)) => {
                self.file = file;
                self.keep_alive = keep_alive;
                self.transmit.begin(headers_len + body_len);
                self.drive_write(registry)
            }
            Err(()) => {
                tracing::warn!(peer = %self.addr, "response did not fit the fixed response buffer");
                self.force_close(registry)
            }
        }
    }

    /// The scatter-gather write loop (§4.7): attempts to flush whatever
    /// remains of the current response, rearming the reactor for the
    /// appropriate direction.
    pub fn write(&mut self, registry: &Registry) -> Disposition {
        self.drive_write(registry)
    }

    fn drive_write(&mut self, registry: &Registry) -> Disposition {
        match writer::drain(
            &mut self.stream,
            &mut self.transmit,
            self.write_buf.as_slice(),
            self.file.as_ref(),
        ) {
            Ok(true) => {
                self.file = None;
                if self.reregister_read(registry).is_err() {
                    return self.force_close(registry);
                }
                if self.keep_alive {
                    self.reset_for_next_request();
                    Disposition::AwaitingRead
                } else {
                    self.force_close(registry)
                }
            }
            Ok(false) => match self.reregister_write(registry) {
                Ok(()) => Disposition::AwaitingWrite,
                Err(_) => self.force_close(registry),
            },
            Err(e) => {
                tracing::debug!(peer = %self.addr, error = %e, "write failed, closing connection");
                self.file = None;
                self.force_close(registry)
            }
        }
    }

    fn reset_for_next_request(&mut self) {
        self.read_buf.reset();
        self.parser.reset();
        self.write_buf.reset();
        self.keep_alive = false;
    }

    fn reregister_read(&mut self, registry: &Registry) -> io::Result<()> {
        self.rearm(registry, Interest::READABLE)
    }

    fn reregister_write(&mut self, registry: &Registry) -> io::Result<()> {
        self.rearm(registry, Interest::WRITABLE)
    }

    /// Arms `interest`, using a fresh `register` if the connection was
    /// deregistered for a worker handoff or a prior `reregister` otherwise.
    fn rearm(&mut self, registry: &Registry, interest: Interest) -> io::Result<()> {
        if self.registered {
            registry.reregister(&mut self.stream, self.token, interest)
        } else {
            registry.register(&mut self.stream, self.token, interest)?;
            self.registered = true;
            Ok(())
        }
    }

    fn force_close(&mut self, registry: &Registry) -> Disposition {
        self.close(registry);
        Disposition::Closed
    }

    /// Deregisters the socket and releases any mapped file. Idempotent.
    pub fn close(&mut self, registry: &Registry) {
        if self.closed {
            return;
        }
        let _ = registry.deregister(&mut self.stream);
        self.file = None;
        self.closed = true;
        self.registered = false;
    }
}
