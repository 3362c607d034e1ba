//! static-httpd - a from-scratch HTTP/1.1 static file server
//!
//! Core library: request parsing, path resolution, response building and the
//! worker pool that serves them.

pub mod config;
pub mod error;
pub mod fs;
pub mod http;
pub mod logging;
pub mod server;
