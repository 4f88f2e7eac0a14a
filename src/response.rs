//! Response assembly (§4.6): status line, fixed response headers, and
//! either an inline error body or a pointer to a mapped file, all written
//! into a connection's fixed-capacity [`WriteBuffer`].

use crate::buffer::WriteBuffer;
use crate::resource::FileMap;

/// HTTP status codes this server ever emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 200 — a file was found, is readable, and has been mapped.
    Ok,
    /// 400 — malformed request line, non-GET method, wrong version,
    /// directory target, or rejected path traversal.
    BadRequest,
    /// 403 — the file exists but lacks world-read permission.
    Forbidden,
    /// 404 — `stat` failed.
    NotFound,
    /// 500 — the parser reached an unreachable state.
    InternalError,
}

impl Status {
    /// The numeric status code, e.g. `404`.
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::InternalError => 500,
        }
    }

    fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::InternalError => "Internal Error",
        }
    }

    fn error_body(self) -> &'static str {
        match self {
            Status::Ok => "",
            Status::BadRequest => "<html><body><h1>400 Bad Request</h1></body></html>",
            Status::Forbidden => "<html><body><h1>403 Forbidden</h1></body></html>",
            Status::NotFound => "<html><body><h1>404 Not Found</h1></body></html>",
            Status::InternalError => "<html><body><h1>500 Internal Error</h1></body></html>",
        }
    }
}

/// Writes a status line, the fixed header block, and (for non-file
/// responses) an inline error body into `buf`. Returns `(headers_len,
/// body_len)`: `headers_len` is the byte offset in `buf` at which the body
/// begins (whether that body is the inline error text or, for a file
/// response, nothing — the body lives in `file` instead), and `body_len` is
/// the advertised `Content-Length`.
///
/// Returns `Err(())` if the response does not fit in `buf`'s fixed
/// capacity; the caller must close the connection rather than emit a
/// truncated response (§4.6, §9).
pub fn assemble(
    buf: &mut WriteBuffer,
    status: Status,
    keep_alive: bool,
    file: Option<&FileMap>,
) -> Result<(usize, usize), ()> {
    buf.reset();

    let body_len = match file {
        Some(map) => map.len(),
        None => status.error_body().len(),
    };

    let status_line = format!("HTTP/1.1 {} {}\r\n", status.code(), status.reason());
    if !buf.push(status_line.as_bytes()) {
        return Err(());
    }

    let headers = format!(
        "Content-Length: {}\r\nContent-Type: text/html\r\nConnection: {}\r\n\r\n",
        body_len,
        if keep_alive { "keep-alive" } else { "close" },
    );
    if !buf.push(headers.as_bytes()) {
        return Err(());
    }

    let headers_len = buf.len();

    if file.is_none() && !buf.push(status.error_body().as_bytes()) {
        return Err(());
    }

    Ok((headers_len, body_len))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn assembles_a_keep_alive_ok_response_with_a_file_body() {
        let mut buf = WriteBuffer::new(1024);
        let (headers_len, body_len) = assemble(&mut buf, Status::Ok, true, None).unwrap();
        let text = std::str::from_utf8(buf.as_slice()).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Connection: keep-alive\r\n"));
        assert_eq!(0, body_len);
        assert_eq!(buf.len(), headers_len);
    }

    #[test]
    fn assembles_an_error_response_with_inline_body_and_close() {
        let mut buf = WriteBuffer::new(1024);
        let (headers_len, body_len) = assemble(&mut buf, Status::NotFound, false, None).unwrap();
        let text = std::str::from_utf8(buf.as_slice()).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert_eq!(body_len, buf.len() - headers_len);
        assert!(text.contains("404 Not Found"));
    }

    #[test]
    fn overflowing_the_response_buffer_is_an_error() {
        let mut buf = WriteBuffer::new(8);
        assert!(assemble(&mut buf, Status::Ok, true, None).is_err());
    }
}
