use std::time::SystemTime;

use bytes::Bytes;

/// Value of the `Server` header on every response.
pub const SERVER_NAME: &str = concat!("static-httpd/", env!("CARGO_PKG_VERSION"));

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Response outcomes the server can produce.
///
/// Each variant indexes one row of the status table, so the numeric code and
/// reason phrase are fixed per variant:
/// - `Ok` (200): file found and readable
/// - `BadRequest` (400): request line could not be tokenised
/// - `Forbidden` (403): path escapes the document root
/// - `NotFound` (404): file or directory index missing
/// - `MethodNotAllowed` (405): anything but GET or HEAD
/// - `InternalServerError` (500): I/O failure or unexpected error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

struct StatusEntry {
    code: u16,
    reason: &'static str,
}

// Indexed by `StatusCode as usize`; keep in variant order.
static STATUS_TABLE: [StatusEntry; 6] = [
    StatusEntry { code: 200, reason: "OK" },
    StatusEntry { code: 400, reason: "Bad Request" },
    StatusEntry { code: 403, reason: "Forbidden" },
    StatusEntry { code: 404, reason: "Not Found" },
    StatusEntry { code: 405, reason: "Method Not Allowed" },
    StatusEntry { code: 500, reason: "Internal Server Error" },
];

impl StatusCode {
    fn entry(self) -> &'static StatusEntry {
        &STATUS_TABLE[self as usize]
    }

    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use static_httpd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    /// ```
    pub fn as_u16(&self) -> u16 {
        self.entry().code
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use static_httpd::http::response::StatusCode;
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        self.entry().reason
    }
}

/// A complete HTTP response ready to be serialized.
///
/// Headers keep insertion order; the writer emits them exactly as built.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .standard_headers(false)
///     .header("Content-Type", "text/html")
///     .body(contents)
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Appends a header line. Duplicates are kept; order is preserved.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Adds the headers every response carries: `Date`, `Server` and
    /// `Connection`.
    pub fn standard_headers(self, keep_alive: bool) -> Self {
        let connection = if keep_alive { "keep-alive" } else { "close" };

        self.header("Date", httpdate::fmt_http_date(SystemTime::now()))
            .header("Server", SERVER_NAME)
            .header("Connection", connection)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the final Response.
    ///
    /// Adds `Content-Length` from the body size unless one was set already;
    /// HEAD responses rely on that to advertise the file size with no body.
    pub fn build(mut self) -> Response {
        let has_length = self
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("Content-Length"));

        if !has_length {
            let len = self.body.len().to_string();
            self.headers.push(("Content-Length".to_string(), len));
        }

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// An error response: plain-text content type and an empty body.
    pub fn error(status: StatusCode, keep_alive: bool) -> Self {
        ResponseBuilder::new(status)
            .standard_headers(keep_alive)
            .header("Content-Type", PLAIN_TEXT)
            .header("Content-Length", "0")
            .build()
    }

    /// A 200 response for a file of `len` bytes.
    ///
    /// `body` is `None` for HEAD; the headers are the same either way.
    pub fn file(len: u64, content_type: &str, body: Option<Bytes>, keep_alive: bool) -> Self {
        let builder = ResponseBuilder::new(StatusCode::Ok)
            .standard_headers(keep_alive)
            .header("Content-Length", len.to_string())
            .header("Content-Type", content_type);

        match body {
            Some(body) => builder.body(body).build(),
            None => builder.build(),
        }
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}
