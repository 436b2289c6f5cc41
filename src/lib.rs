#![deny(missing_docs)]

//! A fixed-size worker thread pool with lifecycle control and live status.
//!
//! Producers submit fire-and-forget closures to a [`WorkerPool`]; a fixed set
//! of OS threads runs them in submission order. The pool can be started,
//! drained, stopped and reconfigured, and reports how many workers are free or
//! busy and how many tasks are pending.
//!
//! Stopping a pool discards every task that no worker has picked up yet. A
//! task that panics is caught and counted; its worker keeps running.

mod config;
mod error;
mod pool;
mod queue;
mod signal;
mod state;
mod status;
mod thread_pool;
mod worker;

pub use config::{PoolConfig, SubmitPolicy};
pub use error::{PoolError, Result};
pub use pool::WorkerPool;
pub use queue::Task;
pub use status::PoolStatus;
pub use thread_pool::ThreadPool;
