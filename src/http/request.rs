use std::collections::HashMap;
use std::fmt;

/// HTTP request methods.
///
/// Only GET and HEAD are served; anything else, including tokens the server
/// has never heard of, is carried through as a method so that the connection
/// can answer 405 Method Not Allowed instead of 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
    POST,
    PUT,
    DELETE,
    OPTIONS,
    PATCH,
    /// Any other method token, kept verbatim
    Other(String),
}

impl Method {
    /// Maps a request-line token to a method. Matching is case-sensitive, as
    /// HTTP method names are.
    ///
    /// # Example
    ///
    /// ```
    /// # use static_httpd::http::request::Method;
    /// assert_eq!(Method::from_token("GET"), Method::GET);
    /// assert_eq!(Method::from_token("get"), Method::Other("get".to_string()));
    /// ```
    pub fn from_token(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Other(s) => s,
        }
    }

    /// Whether the file server handles this method at all.
    pub fn is_supported(&self) -> bool {
        matches!(self, Method::GET | Method::HEAD)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed HTTP request head.
///
/// Built once per connection from the raw header block and never mutated
/// afterwards. The server does not read request bodies.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, HEAD, ...)
    pub method: Method,
    /// Raw resource string from the request line, still percent-encoded and
    /// possibly carrying a query string
    pub resource: String,
    /// Version token if the client sent one; not validated
    pub version: Option<String>,
    /// Request headers, keys as received
    pub headers: HashMap<String, String>,
}

impl Request {
    /// Retrieves a header value by name.
    ///
    /// Keys are stored as the client sent them, so the lookup tries the exact
    /// key first and then falls back to an ASCII case-insensitive scan.
    pub fn header(&self, key: &str) -> Option<&str> {
        if let Some(v) = self.headers.get(key) {
            return Some(v.as_str());
        }

        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the client explicitly asked for a persistent connection.
    ///
    /// Unlike plain HTTP/1.1 semantics, a missing `Connection` header means
    /// `close`. The answer only controls the echoed `Connection` response
    /// header; one request is served per connection either way.
    pub fn keep_alive(&self) -> bool {
        self.header("Connection")
            .map(|v| v.trim().eq_ignore_ascii_case("keep-alive"))
            .unwrap_or(false)
    }
}
