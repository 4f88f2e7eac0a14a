//! End-to-end scenarios driven over real loopback TCP sockets: a live
//! reactor + worker pool serving a temporary document root.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use edgeserve::reactor::Reactor;
use edgeserve::Config;

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!(
            "edgeserve-e2e-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Starts a reactor bound to an ephemeral loopback port with `doc_root`,
/// on a detached thread, and returns its address. The thread is never
/// joined — it runs for the lifetime of the test binary, which is fine
/// for a handful of short-lived integration tests.
fn start_server(doc_root: &Path) -> std::net::SocketAddr {
    let listener = mio::net::TcpListener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();

    let config = Config {
        port: addr.port(),
        doc_root: doc_root.to_path_buf(),
        threads: 2,
        max_requests: 16,
        max_connections: 16,
        read_buffer_size: 2048,
        response_buffer_size: 1024,
        log_level: "error".to_string(),
    };

    let mut reactor = Reactor::new(listener, &config).expect("reactor construction");
    std::thread::spawn(move || {
        let _ = reactor.run();
    });

    // Give the reactor thread time to enter its poll loop before the test
    // starts connecting.
    std::thread::sleep(Duration::from_millis(30));
    addr
}

fn roundtrip(addr: std::net::SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    stream.write_all(request).unwrap();

    let mut response = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => response.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(_) => break,
        }
    }

    String::from_utf8_lossy(&response).into_owned()
}

#[test]
fn keep_alive_get_of_a_small_file() {
    let dir = TempDir::new();
    std::fs::write(dir.path().join("hello.html"), b"0123456789012345678901234567890123456789\0\0")
        .unwrap();
    let addr = start_server(dir.path());

    let response = roundtrip(
        addr,
        b"GET /hello.html HTTP/1.1\r\nConnection: keep-alive\r\n\r\n",
    );

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.contains("Connection: keep-alive\r\n"));
    assert!(response.contains("Content-Length: 42\r\n"));
}

#[test]
fn missing_file_returns_404_and_closes() {
    let dir = TempDir::new();
    let addr = start_server(dir.path());

    let response = roundtrip(addr, b"GET /nope.html HTTP/1.1\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{response}");
    assert!(response.contains("Connection: close\r\n"));
}

#[test]
#[cfg(unix)]
fn unreadable_file_returns_403() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new();
    let path = dir.path().join("secret.html");
    std::fs::write(&path, b"top secret").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
    let addr = start_server(dir.path());

    let response = roundtrip(addr, b"GET /secret.html HTTP/1.1\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 403 Forbidden\r\n"), "{response}");
}

#[test]
fn directory_target_returns_400() {
    let dir = TempDir::new();
    std::fs::create_dir(dir.path().join("subdir")).unwrap();
    let addr = start_server(dir.path());

    let response = roundtrip(addr, b"GET /subdir HTTP/1.1\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
}

#[test]
fn non_get_method_returns_400() {
    let dir = TempDir::new();
    let addr = start_server(dir.path());

    let response = roundtrip(addr, b"POST /hello.html HTTP/1.1\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
}

#[test]
fn a_request_split_across_many_small_writes_still_parses() {
    let dir = TempDir::new();
    std::fs::write(dir.path().join("a.html"), b"ok").unwrap();
    let addr = start_server(dir.path());

    let request = b"GET /a.html HTTP/1.1\r\nConnection: keep-alive\r\n\r\n";
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    for &byte in request {
        stream.write_all(&[byte]).unwrap();
        std::thread::sleep(Duration::from_millis(1));
    }

    let mut response = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                response.extend_from_slice(&chunk[..n]);
                if response.ends_with(b"ok") {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(_) => break,
        }
    }

    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"), "{text}");
    assert!(text.ends_with("ok"));
}

#[test]
fn path_traversal_above_doc_root_returns_400() {
    let dir = TempDir::new();
    let addr = start_server(dir.path());

    let response = roundtrip(addr, b"GET /../../etc/passwd HTTP/1.1\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
}
