//! The scatter-gather response writer (§4.7).
//!
//! A response is at most two buffers: the assembled status line/headers
//! (plus, for error responses, an inline body) and, for a file response,
//! the mapped file region. [`drain`] issues a single `writev` per call and
//! reports whether the whole plan flushed or would have blocked, letting
//! the caller decide whether to rearm the reactor for another writable
//! event or move on.

use std::io::{self, IoSlice, Write};

use mio::net::TcpStream;

use crate::resource::FileMap;

/// Byte-accounting for an in-flight response transmission.
#[derive(Debug, Default)]
pub struct TransmitPlan {
    bytes_sent: usize,
    bytes_to_send: usize,
}

impl TransmitPlan {
    /// Begins transmitting a response of `total` bytes.
    pub fn begin(&mut self, total: usize) {
        self.bytes_sent = 0;
        self.bytes_to_send = total;
    }

    /// Whether the plan has nothing left to send.
    pub fn is_done(&self) -> bool {
        self.bytes_to_send == 0
    }
}

/// Drains as much of `headers` (and, if present, `file`) as a single
/// non-blocking `writev` allows, advancing `plan`.
///
/// Returns `Ok(true)` once `plan` is fully flushed, `Ok(false)` if the
/// socket would block with bytes still outstanding (the caller should
/// rearm for writable readiness), or `Err` on a genuine transport failure.
pub fn drain(
    stream: &mut TcpStream,
    plan: &mut TransmitPlan,
    headers: &[u8],
    file: Option<&FileMap>,
) -> io::Result<bool> {
    loop {
        if plan.is_done() {
            return Ok(true);
        }

        let result = match pending_slices(plan.bytes_sent, headers, file) {
            (first, Some(second)) => stream.write_vectored(&[first, second]),
            (first, None) => stream.write_vectored(&[first]),
        };

        match result {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "write_vectored returned 0 with bytes still outstanding",
                ))
            }
            Ok(n) => {
                plan.bytes_sent += n;
                plan.bytes_to_send -= n;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
            Err(e) => return Err(e),
        }
    }
}

/// Builds the (at most two) `IoSlice`s still outstanding at `bytes_sent`,
/// reslicing both the headers and the file region to skip bytes already
/// acknowledged by the kernel on a prior partial write.
fn pending_slices<'a>(
    bytes_sent: usize,
    headers: &'a [u8],
    file: Option<&'a FileMap>,
) -> (IoSlice<'a>, Option<IoSlice<'a>>) {
    if bytes_sent < headers.len() {
        let head = IoSlice::new(&headers[bytes_sent..]);
        match file {
            Some(map) if !map.is_empty() => (head, Some(IoSlice::new(map.as_slice()))),
            _ => (head, None),
        }
    } else {
        let file_offset = bytes_sent - headers.len();
        let map = file.expect("bytes_sent past the header region implies a file body");
        (IoSlice::new(&map.as_slice()[file_offset..]), None)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::TcpListener as StdTcpListener;

    fn connected_pair() -> (TcpStream, std::net::TcpStream) {
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::net::TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        (TcpStream::from_std(server), client)
    }

    #[test]
    fn drains_a_headers_only_response_in_one_call() {
        let (mut server, mut client) = connected_pair();
        let headers = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";
        let mut plan = TransmitPlan::default();
        plan.begin(headers.len());

        assert!(drain(&mut server, &mut plan, headers, None).unwrap());
        assert!(plan.is_done());

        let mut received = [0u8; 64];
        use std::io::Read;
        let n = client.read(&mut received).unwrap();
        assert_eq!(headers, &received[..n]);
    }
}
