use log::warn;

use crate::{PoolConfig, Result, WorkerPool};

/// A thread pool for executing jobs concurrently.
///
/// Implementors manage a pool of worker threads and distribute
/// incoming jobs across them. Code generic over this trait can run on
/// [`WorkerPool`] or on any other executor wrapped to fit it.
pub trait ThreadPool {
    /// Creates a new thread pool with the given number of threads, ready
    /// to accept jobs.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created (e.g., zero threads).
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// Spawns a function into the thread pool.
    ///
    /// The function will be executed by one of the threads in the pool.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}

impl ThreadPool for WorkerPool {
    fn new(threads: u32) -> Result<Self> {
        let pool = Self::with_config(PoolConfig::new(threads as usize));
        pool.run()?;
        Ok(pool)
    }

    /// Submits the job; a job rejected by a stopped pool is logged and dropped.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(e) = self.submit(job) {
            warn!("Dropping job: {}", e);
        }
    }
}
