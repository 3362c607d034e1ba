//! Listening socket, worker event loops and the pool that runs them.

pub mod listener;
pub mod pool;
pub mod worker;

pub use pool::WorkerPool;
