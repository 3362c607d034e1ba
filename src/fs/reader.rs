use std::io;
use std::path::PathBuf;

use bytes::Bytes;

/// Reads a whole file on the runtime's blocking pool.
///
/// The pool is bounded per worker (`max_blocking_threads`), so a slow disk
/// queues reads instead of stalling the event loop.
pub async fn read_file(path: PathBuf) -> io::Result<Bytes> {
    let contents = tokio::task::spawn_blocking(move || std::fs::read(&path))
        .await
        .map_err(io::Error::other)??;

    Ok(Bytes::from(contents))
}
