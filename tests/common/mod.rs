//! Shared utilities for server integration tests.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use static_httpd::config::ServerConfig;
use static_httpd::server::WorkerPool;

static NEXT_ROOT: AtomicUsize = AtomicUsize::new(0);

pub const INDEX_HTML: &[u8] = b"<h1>hi</h1>\n";
pub const A_TXT: &[u8] = b"hello";

/// A throwaway document root, removed on drop.
pub struct TempRoot {
    path: PathBuf,
}

impl TempRoot {
    /// Creates a root holding `index.html` (12 bytes), `a.txt` (5 bytes) and
    /// an empty `empty/` directory.
    pub fn new() -> Self {
        let n = NEXT_ROOT.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "static-httpd-test-{}-{}",
            std::process::id(),
            n
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(path.join("empty")).unwrap();
        std::fs::write(path.join("index.html"), INDEX_HTML).unwrap();
        std::fs::write(path.join("a.txt"), A_TXT).unwrap();

        let path = path.canonicalize().unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, rel: &str, contents: &[u8]) {
        let file = self.path.join(rel);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(file, contents).unwrap();
    }
}

impl Drop for TempRoot {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// A running pool on an ephemeral port, stopped on drop.
pub struct TestServer {
    pub root: TempRoot,
    pool: WorkerPool,
}

impl TestServer {
    pub fn start(workers: usize) -> Self {
        Self::start_with(workers, |_| {})
    }

    pub fn start_with(workers: usize, tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let root = TempRoot::new();
        let mut config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            root: root.path().to_path_buf(),
            workers,
            ..ServerConfig::default()
        };
        tweak(&mut config);

        let mut pool = WorkerPool::bind(config.validate().unwrap()).unwrap();
        pool.spawn().unwrap();

        Self { root, pool }
    }

    pub fn addr(&self) -> SocketAddr {
        self.pool.local_addr()
    }

    pub fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr()).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        stream
    }

    /// Sends `raw` and reads until the server closes the connection.
    pub fn exchange(&self, raw: &[u8]) -> RawResponse {
        let mut stream = self.connect();
        stream.write_all(raw).unwrap();
        read_response(&mut stream)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.pool.shutdown();
        self.pool.join();
    }
}

#[derive(Debug)]
pub struct RawResponse {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn status(&self) -> u16 {
        self.status_line
            .split(' ')
            .nth(1)
            .and_then(|code| code.parse().ok())
            .unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub fn read_response(stream: &mut TcpStream) -> RawResponse {
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).unwrap();
    parse_response(&raw)
}

pub fn parse_response(raw: &[u8]) -> RawResponse {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    let head = String::from_utf8_lossy(&raw[..end]).into_owned();
    let mut lines = head.split("\r\n");

    let status_line = lines.next().unwrap().to_string();
    let headers = lines
        .filter_map(|line| line.split_once(": "))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    RawResponse {
        status_line,
        headers,
        body: raw[end + 4..].to_vec(),
    }
}
