//! Filesystem side of the server: mapping URLs onto the document root and
//! reading file contents without blocking the event loop.

pub mod reader;
pub mod resolver;
