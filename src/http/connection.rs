use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::error::HandlerError;
use crate::fs::reader::read_file;
use crate::fs::resolver::{ResolvedPath, Resolver};
use crate::http::parser::{find_headers_end, parse_http_request, parse_request_head, ParseError};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

const READ_CHUNK: usize = 4096;

/// Largest request head accepted, terminator included.
pub const MAX_HEADER_BYTES: usize = 16 * 1024;

/// One accepted client socket and the request it is serving.
///
/// A connection answers exactly one request and then closes, whatever the
/// client put in its `Connection` header.
pub struct Connection<S = TcpStream> {
    stream: S,
    peer: SocketAddr,
    buffer: BytesMut,
    resolver: Arc<Resolver>,
    header_timeout: Option<Duration>,
    state: ConnectionState,
    keep_alive: bool,
    responded: bool,
}

/// Outcome of reading the request head.
enum Head {
    Block(Bytes),
    TooLarge,
    Gone,
}

pub enum ConnectionState {
    AwaitHeaders,
    Parse(Bytes),
    Dispatch(Request),
    Resolve(Request),
    ReadFile(Request, ResolvedPath),
    Respond(ResponseWriter),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, resolver: Arc<Resolver>) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            resolver,
            header_timeout: None,
            state: ConnectionState::AwaitHeaders,
            keep_alive: false,
            responded: false,
        }
    }

    pub fn with_header_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.header_timeout = timeout;
        self
    }

    /// Drives the connection to `Closed`.
    ///
    /// Errors that escape the state machine are answered with a 500 when no
    /// response has gone out yet. The socket is shut down on every path.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let result = self.drive().await;

        if let Err(e) = &result {
            if !self.responded {
                let failure = HandlerError::Internal(anyhow::anyhow!("{e:#}"));
                error!(peer = %self.peer, error = %failure, "unexpected error while handling request");
                let response = Response::error(failure.status(), self.keep_alive);
                let _ = ResponseWriter::new(&response)
                    .write_to_stream(&mut self.stream)
                    .await;
            }
        }

        self.state = ConnectionState::Closed;
        let _ = self.stream.shutdown().await;

        result
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::AwaitHeaders => match self.await_headers().await? {
                    Head::Block(block) => ConnectionState::Parse(block),
                    Head::TooLarge => self.fail(None, HandlerError::HeadersTooLarge(MAX_HEADER_BYTES)),
                    Head::Gone => ConnectionState::Closed,
                },

                ConnectionState::Parse(block) => match parse(&block) {
                    Ok(request) => {
                        self.keep_alive = request.keep_alive();
                        ConnectionState::Dispatch(request)
                    }
                    Err(_) => self.fail(None, HandlerError::Protocol),
                },

                ConnectionState::Dispatch(request) => {
                    if request.method.is_supported() {
                        ConnectionState::Resolve(request)
                    } else {
                        let e = HandlerError::UnsupportedMethod(request.method.to_string());
                        self.fail(Some(&request), e)
                    }
                }

                ConnectionState::Resolve(request) => self.resolve(request),

                ConnectionState::ReadFile(request, resolved) => {
                    match read_file(resolved.path.clone()).await {
                        Ok(body) => {
                            let response = Response::file(
                                body.len() as u64,
                                &resolved.content_type(),
                                Some(body),
                                self.keep_alive,
                            );
                            ConnectionState::Respond(ResponseWriter::new(&response))
                        }
                        Err(source) => {
                            let e = HandlerError::Io { path: resolved.path, source };
                            self.fail(Some(&request), e)
                        }
                    }
                }

                ConnectionState::Respond(writer) => {
                    self.responded = true;
                    writer.write_to_stream(&mut self.stream).await?;
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        Ok(())
    }

    /// Reads until the header terminator or EOF.
    ///
    /// `Head::Gone` means the peer went away (or timed out) without sending
    /// a byte; no response is owed then.
    async fn await_headers(&mut self) -> anyhow::Result<Head> {
        let Some(limit) = self.header_timeout else {
            return self.read_head().await;
        };

        match tokio::time::timeout(limit, self.read_head()).await {
            Ok(head) => head,
            Err(_) => {
                debug!(peer = %self.peer, "timed out waiting for request headers");
                Ok(Head::Gone)
            }
        }
    }

    async fn read_head(&mut self) -> anyhow::Result<Head> {
        // Bytes before `scanned` hold no terminator; only the last three may
        // start one that the next read completes.
        let mut scanned = 0;

        loop {
            if let Some(pos) = find_headers_end(&self.buffer[scanned..]) {
                let end = scanned + pos + 4;
                if end > MAX_HEADER_BYTES {
                    return Ok(Head::TooLarge);
                }
                return Ok(Head::Block(self.buffer.split_to(end).freeze()));
            }

            if self.buffer.len() > MAX_HEADER_BYTES {
                return Ok(Head::TooLarge);
            }
            scanned = self.buffer.len().saturating_sub(3);

            self.buffer.reserve(READ_CHUNK);
            let n = self.stream.read_buf(&mut self.buffer).await?;

            if n == 0 {
                // Client closed connection
                if self.buffer.is_empty() {
                    return Ok(Head::Gone);
                }
                return Ok(Head::Block(self.buffer.split().freeze()));
            }
        }
    }

    fn resolve(&mut self, request: Request) -> ConnectionState {
        let resolved = self.resolver.resolve(&request.resource);

        if let Err(e) = resolved.check() {
            return self.fail(Some(&request), e);
        }

        info!(
            peer = %self.peer,
            method = %request.method,
            path = %resolved.path.display(),
            status = 200,
            "serving file"
        );

        match request.method {
            Method::GET => ConnectionState::ReadFile(request, resolved),
            _ => {
                let response = Response::file(
                    resolved.len,
                    &resolved.content_type(),
                    None,
                    self.keep_alive,
                );
                ConnectionState::Respond(ResponseWriter::new(&response))
            }
        }
    }

    fn fail(&self, request: Option<&Request>, e: HandlerError) -> ConnectionState {
        let status = e.status();
        let method = request.map(|r| r.method.as_str()).unwrap_or("-");
        let resource = request.map(|r| r.resource.as_str()).unwrap_or("-");

        match &e {
            HandlerError::Io { .. } | HandlerError::Internal(_) => error!(
                peer = %self.peer, method, resource, status = status.as_u16(), error = %e,
                "request failed"
            ),
            _ => warn!(
                peer = %self.peer, method, resource, status = status.as_u16(), error = %e,
                "request rejected"
            ),
        }

        let response = Response::error(status, self.keep_alive);
        ConnectionState::Respond(ResponseWriter::new(&response))
    }
}

fn parse(block: &[u8]) -> Result<Request, ParseError> {
    match parse_http_request(block) {
        Ok((request, _)) => Ok(request),
        Err(ParseError::Incomplete) => parse_request_head(block),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, ReadBuf};

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn exchange(root: PathBuf, raw: &[u8]) -> String {
        let (client, server) = duplex(64 * 1024);
        let resolver = Arc::new(Resolver::new(root));
        let handler = tokio::spawn(async move {
            let mut conn = Connection::new(server, peer(), resolver);
            conn.run().await
        });

        let (mut rd, mut wr) = tokio::io::split(client);
        wr.write_all(raw).await.unwrap();
        wr.shutdown().await.unwrap();

        let mut out = Vec::new();
        rd.read_to_end(&mut out).await.unwrap();
        handler.await.unwrap().unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    #[tokio::test]
    async fn empty_connection_gets_no_response() {
        let out = exchange(std::env::temp_dir(), b"").await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn single_token_request_line_is_bad_request() {
        let out = exchange(std::env::temp_dir(), b"GET\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(out.contains("Content-Length: 0\r\n"));
        assert!(out.contains("Connection: close\r\n"));
    }

    #[tokio::test]
    async fn unknown_method_is_not_allowed() {
        let out = exchange(std::env::temp_dir(), b"BREW /pot HTTP/1.1\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    }

    #[tokio::test]
    async fn partial_head_before_eof_is_judged_by_request_line() {
        let out = exchange(std::env::temp_dir(), b"GET /../x HTTP/1.1\r\n").await;
        assert!(out.starts_with("HTTP/1.1 403 Forbidden\r\n"));
    }

    #[tokio::test]
    async fn keep_alive_is_echoed() {
        let raw = b"GET /definitely-missing HTTP/1.1\r\nConnection: keep-alive\r\n\r\n";
        let out = exchange(std::env::temp_dir(), raw).await;
        assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(out.contains("Connection: keep-alive\r\n"));
    }

    #[tokio::test]
    async fn terminator_split_across_reads_is_found() {
        let (client, server) = duplex(64 * 1024);
        let resolver = Arc::new(Resolver::new(std::env::temp_dir()));
        let handler = tokio::spawn(async move {
            let mut conn = Connection::new(server, peer(), resolver);
            conn.run().await
        });

        let (mut rd, mut wr) = tokio::io::split(client);
        wr.write_all(b"BREW /pot HTTP/1.1\r\n\r").await.unwrap();
        tokio::task::yield_now().await;
        wr.write_all(b"\n").await.unwrap();

        let mut out = Vec::new();
        rd.read_to_end(&mut out).await.unwrap();
        handler.await.unwrap().unwrap();
        assert!(out.starts_with(b"HTTP/1.1 405 Method Not Allowed\r\n"));
    }

    #[tokio::test]
    async fn oversized_head_is_bad_request() {
        let mut raw = b"GET / HTTP/1.1\r\nX-Filler: ".to_vec();
        raw.resize(MAX_HEADER_BYTES + 4096, b'a');

        let out = exchange(std::env::temp_dir(), &raw).await;
        assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(out.contains("Content-Length: 0\r\n"));
    }

    #[tokio::test]
    async fn complete_head_over_the_limit_is_bad_request() {
        let mut raw = b"GET / HTTP/1.1\r\nX-Filler: ".to_vec();
        raw.resize(MAX_HEADER_BYTES, b'a');
        raw.extend_from_slice(b"\r\n\r\n");

        let out = exchange(std::env::temp_dir(), &raw).await;
        assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn unreadable_file_is_internal_error() {
        // Regular file by metadata, but reading from offset 0 fails.
        let out = exchange(PathBuf::from("/proc/self"), b"GET /mem HTTP/1.1\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(out.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(out.contains("Content-Length: 0\r\n"));
    }

    /// Fails every read and records every write.
    #[derive(Default)]
    struct BrokenStream {
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl AsyncRead for BrokenStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::from(io::ErrorKind::ConnectionReset)))
        }
    }

    impl AsyncWrite for BrokenStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn escaped_error_is_answered_with_internal_error() {
        let stream = BrokenStream::default();
        let written = Arc::clone(&stream.written);
        let resolver = Arc::new(Resolver::new(std::env::temp_dir()));

        let mut conn = Connection::new(stream, peer(), resolver);
        assert!(conn.run().await.is_err());

        let out = String::from_utf8(written.lock().unwrap().clone()).unwrap();
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(out.contains("Content-Length: 0\r\n"));
    }
}
