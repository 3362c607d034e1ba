use crate::http::request::{Method, Request};
use std::collections::HashMap;

const HEADERS_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// The request line does not hold at least a method and a resource
    InvalidRequest,
    /// No header terminator yet
    Incomplete,
}

/// Parses a request head out of `buf`.
///
/// Returns the request and the number of bytes consumed (header block plus
/// terminator), or `Incomplete` while `\r\n\r\n` has not been seen.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let request = parse_request_head(&buf[..headers_end])?;

    Ok((request, headers_end + HEADERS_END.len()))
}

/// Parses a header block that carries no terminator.
///
/// Used directly when a peer half-closes before sending `\r\n\r\n`; whatever
/// arrived is judged by its request line.
pub fn parse_request_head(block: &[u8]) -> Result<Request, ParseError> {
    let text = String::from_utf8_lossy(block);
    let mut lines = text.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method = parts.next().ok_or(ParseError::InvalidRequest)?;
    let resource = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().map(str::to_string);

    // Headers
    let mut headers = HashMap::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        // Lines without ": " are dropped, not fatal
        if let Some((key, value)) = line.split_once(": ") {
            headers.insert(key.to_string(), value.to_string());
        }
    }

    Ok(Request {
        method: Method::from_token(method),
        resource: resource.to_string(),
        version,
        headers,
    })
}

pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADERS_END.len())
        .position(|w| w == HEADERS_END)
}
