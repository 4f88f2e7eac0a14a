//! Fixed-capacity contiguous byte buffers used by a connection's read and
//! response sides.
//!
//! Unlike a growable buffer, capacity is fixed at construction: a read that
//! would overflow it is a protocol error (the request is too large), and a
//! response that would overflow it is an assembly error (§4.6). This mirrors
//! the original design's stack-allocated `char[READ_BUFFER_SIZE]` /
//! `char[RESPONSE_BUFFER_SIZE]` arrays, just heap-allocated once per
//! connection instead.

/// A fixed-capacity buffer filled by repeated non-blocking reads.
///
/// Tracks two cursors into the same backing storage: `read_idx` marks how
/// many bytes have been received from the socket, `checked_idx` marks how
/// many of those the parser has already inspected. The invariant
/// `checked_idx <= read_idx <= capacity` holds at all times.
#[derive(Debug)]
pub struct ReadBuffer {
    data: Box<[u8]>,
    read_idx: usize,
    checked_idx: usize,
}

impl ReadBuffer {
    /// Allocates a buffer with the given fixed capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            read_idx: 0,
            checked_idx: 0,
        }
    }

    /// Total capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes received but not yet inspected by the parser.
    pub fn checked_idx(&self) -> usize {
        self.checked_idx
    }

    /// Bytes received so far.
    pub fn read_idx(&self) -> usize {
        self.read_idx
    }

    /// Whether the buffer has no room left for further reads.
    pub fn is_full(&self) -> bool {
        self.read_idx >= self.data.len()
    }

    /// The destination slice for the next `read(2)`: `[read_idx..capacity]`.
    pub fn spare_capacity(&mut self) -> &mut [u8] {
        &mut self.data[self.read_idx..]
    }

    /// Records that `n` additional bytes were received.
    pub fn advance_read(&mut self, n: usize) {
        self.read_idx = (self.read_idx + n).min(self.data.len());
    }

    /// The full region received so far, from the start of the buffer.
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.read_idx]
    }

    /// The region the parser has not yet inspected.
    pub fn unchecked(&self) -> &[u8] {
        &self.data[self.checked_idx..self.read_idx]
    }

    /// Advances `checked_idx` by `n`, without exceeding `read_idx`.
    pub fn advance_checked(&mut self, n: usize) {
        self.checked_idx = (self.checked_idx + n).min(self.read_idx);
    }

    /// Resets both cursors to zero, discarding any buffered bytes. Called
    /// between keep-alive requests and on connection reinitialization.
    pub fn reset(&mut self) {
        self.read_idx = 0;
        self.checked_idx = 0;
    }
}

/// A fixed-capacity buffer the response assembler writes status line and
/// headers into.
#[derive(Debug)]
pub struct WriteBuffer {
    data: Box<[u8]>,
    write_idx: usize,
}

impl WriteBuffer {
    /// Allocates a buffer with the given fixed capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            write_idx: 0,
        }
    }

    /// Bytes written into the buffer so far.
    pub fn len(&self) -> usize {
        self.write_idx
    }

    /// Whether the buffer currently holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.write_idx == 0
    }

    /// Appends `bytes`, returning `false` without writing anything if they
    /// would overflow the buffer's fixed capacity.
    #[must_use]
    pub fn push(&mut self, bytes: &[u8]) -> bool {
        let end = self.write_idx + bytes.len();
        if end > self.data.len() {
            return false;
        }
        self.data[self.write_idx..end].copy_from_slice(bytes);
        self.write_idx = end;
        true
    }

    /// The bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.write_idx]
    }

    /// Resets the cursor to zero, ready for the next response.
    pub fn reset(&mut self) {
        self.write_idx = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_buffer_tracks_both_cursors_independently() {
        let mut buf = ReadBuffer::new(16);
        buf.spare_capacity()[..5].copy_from_slice(b"hello");
        buf.advance_read(5);
        assert_eq!(5, buf.read_idx());
        assert_eq!(0, buf.checked_idx());
        assert_eq!(b"hello", buf.unchecked());

        buf.advance_checked(3);
        assert_eq!(3, buf.checked_idx());
        assert_eq!(b"lo", buf.unchecked());
    }

    #[test]
    fn read_buffer_is_full_when_read_idx_reaches_capacity() {
        let mut buf = ReadBuffer::new(4);
        assert!(!buf.is_full());
        buf.advance_read(4);
        assert!(buf.is_full());
    }

    #[test]
    fn read_buffer_reset_clears_both_cursors() {
        let mut buf = ReadBuffer::new(8);
        buf.advance_read(8);
        buf.advance_checked(4);
        buf.reset();
        assert_eq!(0, buf.read_idx());
        assert_eq!(0, buf.checked_idx());
    }

    #[test]
    fn write_buffer_push_rejects_overflow() {
        let mut buf = WriteBuffer::new(8);
        assert!(buf.push(b"1234"));
        assert!(!buf.push(b"56789"));
        assert_eq!(b"1234", buf.as_slice());
    }

    #[test]
    fn write_buffer_reset_allows_reuse() {
        let mut buf = WriteBuffer::new(8);
        buf.push(b"abcd");
        buf.reset();
        assert!(buf.is_empty());
        assert!(buf.push(b"12345678"));
    }
}
