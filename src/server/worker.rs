//! Worker event loop.
//!
//! Each worker is one OS thread driving its own single-threaded tokio
//! runtime. Connections accepted by the worker are spawned as tasks on that
//! runtime and never migrate; they yield only while waiting on the socket or
//! on a file read running in the worker's bounded blocking pool.

use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::fs::resolver::Resolver;
use crate::http::connection::Connection;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Runs one worker until `stop` fires or its sender goes away.
///
/// Handlers still in flight when the loop exits are abandoned, not drained.
pub fn run(
    id: usize,
    listener: StdTcpListener,
    config: Arc<ServerConfig>,
    stop: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .max_blocking_threads(config.blocking_threads)
        .thread_name(format!("worker-{id}-blocking"))
        .build()
        .context("failed to build worker runtime")?;

    let result = runtime.block_on(accept_loop(id, listener, config, stop));
    runtime.shutdown_background();

    result
}

async fn accept_loop(
    id: usize,
    listener: StdTcpListener,
    config: Arc<ServerConfig>,
    mut stop: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::from_std(listener)?;
    let resolver = Arc::new(Resolver::new(config.root.clone()));
    let header_timeout = config.header_timeout();

    info!(worker = id, "Starting server worker at http://{}", config.address());

    loop {
        tokio::select! {
            res = listener.accept() => {
                let (socket, peer) = match res {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(worker = id, error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                };

                info!(worker = id, "Accepted connection from {}", peer);

                let resolver = resolver.clone();
                tokio::spawn(async move {
                    let mut conn = Connection::new(socket, peer, resolver)
                        .with_header_timeout(header_timeout);
                    if let Err(e) = conn.run().await {
                        warn!("Connection error from {}: {:#}", peer, e);
                    }
                });
            }

            _ = stop.changed() => {
                debug!(worker = id, "stop signal received");
                break;
            }
        }
    }

    info!(worker = id, "Closing server worker");
    Ok(())
}
