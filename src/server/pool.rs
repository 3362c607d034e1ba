//! Worker pool manager.
//!
//! Binds the listening socket once, hands a duplicate of it to every worker,
//! and keeps the only record of the running workers so that a termination
//! signal can be broadcast to all of them.

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::server::{listener, worker};

struct Worker {
    id: usize,
    stop: watch::Sender<bool>,
    thread: JoinHandle<anyhow::Result<()>>,
}

/// Reports a worker's exit to the manager, including when it panics.
struct ExitNotice {
    id: usize,
    tx: mpsc::UnboundedSender<usize>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.tx.send(self.id);
    }
}

pub struct WorkerPool {
    config: Arc<ServerConfig>,
    listener: Option<StdTcpListener>,
    local_addr: SocketAddr,
    workers: Vec<Worker>,
    exit_tx: mpsc::UnboundedSender<usize>,
    exit_rx: mpsc::UnboundedReceiver<usize>,
}

impl WorkerPool {
    /// Binds and listens; no worker runs yet.
    pub fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let addr = config.socket_addr()?;
        let listener = listener::bind(addr)?;
        let local_addr = listener.local_addr()?;
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();

        info!("Listening on {}", local_addr);

        Ok(Self {
            config: Arc::new(config),
            listener: Some(listener),
            local_addr,
            workers: Vec::new(),
            exit_tx,
            exit_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Launches `config.workers` workers, each on its own duplicate of the
    /// listening socket, then drops the manager's own handle.
    pub fn spawn(&mut self) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .context("workers already spawned")?;

        for id in 0..self.config.workers {
            let socket = listener
                .try_clone()
                .context("failed to duplicate listening socket")?;
            let config = self.config.clone();
            let (stop, stop_rx) = watch::channel(false);
            let notice = ExitNotice { id, tx: self.exit_tx.clone() };

            let thread = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || {
                    let _notice = notice;
                    worker::run(id, socket, config, stop_rx)
                })
                .with_context(|| format!("failed to spawn worker {id}"))?;

            self.workers.push(Worker { id, stop, thread });
        }

        drop(listener);
        info!(workers = self.workers.len(), root = %self.config.root.display(), "worker pool started");

        Ok(())
    }

    /// Broadcasts the stop signal to every worker. Best-effort: in-flight
    /// connections are not drained.
    pub fn shutdown(&self) {
        for worker in &self.workers {
            let _ = worker.stop.send(true);
        }
    }

    /// Waits for every worker thread to finish.
    pub fn join(&mut self) {
        for worker in self.workers.drain(..) {
            match worker.thread.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(worker = worker.id, "worker failed: {:#}", e),
                Err(_) => error!(worker = worker.id, "worker panicked"),
            }
        }
    }

    /// Blocks until SIGINT/SIGTERM arrives or every worker has exited on its
    /// own.
    pub fn wait(&mut self) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build signal runtime")?;

        let remaining = self.workers.len();
        runtime.block_on(wait_for_stop(&mut self.exit_rx, remaining))
    }

    /// Runs a server for `config` until it is told to stop; returns once all
    /// workers have exited.
    pub fn start(config: ServerConfig) -> anyhow::Result<()> {
        let mut pool = Self::bind(config)?;
        pool.spawn()?;

        let waited = pool.wait();
        pool.shutdown();
        pool.join();

        info!("server stopped");
        waited
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn wait_for_stop(
    exits: &mut mpsc::UnboundedReceiver<usize>,
    mut remaining: usize,
) -> anyhow::Result<()> {
    let signal = shutdown_signal();
    tokio::pin!(signal);

    while remaining > 0 {
        tokio::select! {
            res = &mut signal => {
                let name = res?;
                info!("Termination request received ({}), shutting down workers", name);
                return Ok(());
            }
            Some(id) = exits.recv() => {
                warn!(worker = id, "worker exited");
                remaining -= 1;
            }
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = interrupt.recv() => Ok("SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
