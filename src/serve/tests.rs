use std::fs;
use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use super::response::HEALTH_BODY;
use super::revision::{KEEP_ALIVE_FRAME, RETRY_FRAME, data_frame};
use super::{ServeOptions, ServerHandle, bind};

struct Running {
    _site: TempDir,
    addr: SocketAddr,
    handle: ServerHandle,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Running {
    fn drop(&mut self) {
        self.handle.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn start(keep_alive: Duration) -> Running {
    let site = TempDir::new().unwrap();
    write(&site.path().join("content/docs/intro/index.mdx"), "# intro");
    write(&site.path().join("content/docs/guide/index.md"), "# guide");
    write(&site.path().join("public/img/favicon.ico"), "ico");

    let options = ServeOptions {
        root: site.path().to_path_buf(),
        interface: Ipv4Addr::LOCALHOST.into(),
        port: 0,
        revision: "rev-1".to_string(),
        keep_alive,
    };
    let bound = bind(options).unwrap();
    let addr = bound.addr();
    let handle = bound.handle();
    let thread = thread::spawn(move || bound.run().unwrap());

    Running {
        _site: site,
        addr,
        handle,
        thread: Some(thread),
    }
}

struct Reply {
    status: u16,
    head: String,
    body: String,
}

fn get(addr: SocketAddr, path: &str) -> Reply {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    write!(stream, "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).unwrap();
    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head.split(' ').nth(1).unwrap().parse().unwrap();
    Reply {
        status,
        head: head.to_ascii_lowercase(),
        body: body.to_string(),
    }
}

/// Read from `stream` until `needle` shows up or the deadline passes.
fn read_until(stream: &mut TcpStream, needle: &str, limit: Duration) -> String {
    stream.set_read_timeout(Some(Duration::from_millis(100))).unwrap();
    let started = Instant::now();
    let mut seen = Vec::new();
    let mut buf = [0u8; 1024];
    while started.elapsed() < limit {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => seen.extend_from_slice(&buf[..n]),
            Err(_) => {}
        }
        if String::from_utf8_lossy(&seen).contains(needle) {
            break;
        }
    }
    String::from_utf8_lossy(&seen).into_owned()
}

#[test]
fn test_health_check() {
    let server = start(Duration::from_secs(30));
    let reply = get(server.addr, "/healthz");
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, HEALTH_BODY);
}

#[test]
fn test_docs_follow_content_presence() {
    let server = start(Duration::from_secs(30));

    let intro = get(server.addr, "/docs/intro/");
    assert_eq!(intro.status, 200);
    assert!(intro.body.contains("ok:intro"));
    assert!(intro.body.contains("/__dev/reload.js"));

    assert_eq!(get(server.addr, "/docs/guide/").status, 200);
    assert_eq!(get(server.addr, "/docs/missing/").status, 404);
    assert_eq!(get(server.addr, "/docs/intro").status, 404);
}

#[test]
fn test_public_files_and_fallback() {
    let server = start(Duration::from_secs(30));

    let icon = get(server.addr, "/img/favicon.ico");
    assert_eq!(icon.status, 200);
    assert!(icon.head.contains("content-type: image/x-icon"));
    assert_eq!(icon.body, "ico");

    assert_eq!(get(server.addr, "/nope").status, 404);
}

#[test]
fn test_revision_pull() {
    let server = start(Duration::from_secs(30));
    let reply = get(server.addr, "/api/dev/revision");

    assert_eq!(reply.status, 200);
    assert!(reply.head.contains("content-type: application/json"));
    assert!(reply.head.contains("cache-control: no-store, max-age=0"));

    let json: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(json["revision"], "rev-1");
}

#[test]
fn test_reload_script() {
    let server = start(Duration::from_secs(30));
    let reply = get(server.addr, "/__dev/reload.js");
    assert_eq!(reply.status, 200);
    assert!(reply.body.contains("EventSource"));
    assert!(reply.body.contains("/api/dev/revision/stream"));
}

#[test]
fn test_revision_stream_frames() {
    let server = start(Duration::from_millis(100));

    let mut stream = TcpStream::connect(server.addr).unwrap();
    write!(stream, "GET /api/dev/revision/stream HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();

    let seen = read_until(&mut stream, KEEP_ALIVE_FRAME, Duration::from_secs(5));
    let (head, body) = seen.split_once("\r\n\r\n").unwrap();
    let head = head.to_ascii_lowercase();

    assert!(head.starts_with("http/1.1 200"));
    assert!(head.contains("content-type: text/event-stream; charset=utf-8"));
    assert!(head.contains("cache-control: no-store, max-age=0"));

    let expected = format!("{RETRY_FRAME}{}", data_frame("rev-1"));
    assert!(body.starts_with(&expected), "{body:?}");
    assert!(body[expected.len()..].starts_with(KEEP_ALIVE_FRAME));
}

#[test]
fn test_stop_with_open_stream() {
    let mut server = start(Duration::from_secs(30));

    let mut stream = TcpStream::connect(server.addr).unwrap();
    write!(stream, "GET /api/dev/revision/stream HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
    let seen = read_until(&mut stream, "data:", Duration::from_secs(5));
    assert!(seen.contains("rev-1"));

    // An open stream must not keep the request loop alive
    let started = Instant::now();
    server.handle.stop();
    if let Some(thread) = server.thread.take() {
        thread.join().unwrap();
    }
    assert!(started.elapsed() < Duration::from_secs(5));
}
