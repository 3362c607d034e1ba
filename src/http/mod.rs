//! HTTP protocol implementation.
//!
//! A hand-rolled subset of HTTP/1.1 for serving static files: GET and HEAD,
//! one request per connection, no request bodies.
//!
//! # Architecture
//!
//! - **`connection`**: per-connection state machine that owns the socket
//! - **`parser`**: parses request heads from byte buffers
//! - **`request`**: parsed request representation
//! - **`response`**: status table and response builder
//! - **`writer`**: serializes and writes responses to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌────────────────┐
//!        │  AwaitHeaders  │ ← read until \r\n\r\n (EOF with no data → Closed)
//!        └───────┬────────┘ ── head over MAX_HEADER_BYTES ────┐
//!                ▼                                            │
//!        ┌────────────────┐                                   │
//!        │     Parse      │ ── bad request line ──────────────┤
//!        └───────┬────────┘                                   │
//!                ▼                                            │
//!        ┌────────────────┐                                   │
//!        │    Dispatch    │ ── not GET/HEAD ──────────────────┤
//!        └───────┬────────┘                                   │
//!                ▼                                            │
//!        ┌────────────────┐                                   │
//!        │    Resolve     │ ── outside root / missing ────────┤
//!        └───────┬────────┘                                   │
//!                │ GET               HEAD                     │
//!                ▼                     │                      │
//!        ┌────────────────┐            │                      │
//!        │    ReadFile    │ ── I/O ────┼──────────────────────┤
//!        └───────┬────────┘            │                      │
//!                ▼                     ▼                      ▼
//!        ┌──────────────────────────────────────────────────────┐
//!        │                       Respond                        │
//!        └──────────────────────────┬───────────────────────────┘
//!                                   ▼
//!                                 Closed
//! ```

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
