// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Incremental HTTP/1.1 request parsing.
//!
//! [`request::RequestParser`] is restartable across an arbitrary split of
//! the input into `read(2)` calls: it never assumes a complete request is
//! present in the buffer, and resumes exactly where the previous call left
//! off by tracking [`crate::buffer::ReadBuffer`]'s `checked_idx` cursor.

pub mod request;

use std::fmt::Display;

/// The request method. Only `GET` is accepted by this server; other
/// well-formed methods still name themselves here for diagnostics, but the
/// parser rejects everything except [`Method::Get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// RFC 9110 §9.3.1 — the only method this server serves.
    Get,
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
        })
    }
}

/// The request's HTTP version. Only `HTTP/1.1` is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// HTTP/1.1, RFC 9112.
    Http11,
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Http11 => "HTTP/1.1",
        })
    }
}

/// Result of scanning the unchecked region of a read buffer for a complete
/// CRLF-terminated line.
#[derive(Debug, PartialEq, Eq)]
pub enum LineOutcome {
    /// A complete line was found; `len` is the number of bytes preceding the
    /// terminating `\r\n` (i.e. not counting the CRLF itself).
    Complete {
        /// Byte length of the line, excluding the trailing `\r\n`.
        len: usize,
    },
    /// No terminator yet; the caller should read more and try again.
    Open,
    /// A bare `\r` not followed by `\n`, or a bare `\n` not preceded by
    /// `\r`.
    Bad,
}

/// Scans `window` — the parser's unchecked region — for a CRLF terminator.
///
/// Does not mutate `window`; the caller advances its own cursors based on
/// the returned outcome. This is the "line extractor" of §4.5: it never
/// rewrites bytes in place (the original null-terminates lines in the
/// buffer; Rust slices already carry their own length).
pub fn scan_line(window: &[u8]) -> LineOutcome {
    let mut i = 0;
    while i < window.len() {
        match window[i] {
            b'\r' => {
                return match window.get(i + 1) {
                    Some(b'\n') => LineOutcome::Complete { len: i },
                    Some(_) => LineOutcome::Bad,
                    None => LineOutcome::Open,
                };
            }
            b'\n' => return LineOutcome::Bad,
            _ => i += 1,
        }
    }
    LineOutcome::Open
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scan_line_finds_complete_line() {
        assert_eq!(
            LineOutcome::Complete { len: 5 },
            scan_line(b"hello\r\nmore")
        );
    }

    #[test]
    fn scan_line_reports_open_with_no_terminator() {
        assert_eq!(LineOutcome::Open, scan_line(b"hello"));
    }

    #[test]
    fn scan_line_reports_open_when_cr_is_last_byte() {
        assert_eq!(LineOutcome::Open, scan_line(b"hello\r"));
    }

    #[test]
    fn scan_line_reports_bad_on_bare_cr() {
        assert_eq!(LineOutcome::Bad, scan_line(b"hello\rworld\r\n"));
    }

    #[test]
    fn scan_line_reports_bad_on_bare_lf() {
        assert_eq!(LineOutcome::Bad, scan_line(b"hello\nworld\r\n"));
    }

    #[test]
    fn scan_line_finds_empty_line() {
        assert_eq!(LineOutcome::Complete { len: 0 }, scan_line(b"\r\nrest"));
    }
}
