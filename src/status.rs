use serde::Serialize;

/// A snapshot of the pool taken under a single read lock.
///
/// Every field is consistent with every other field at the instant the
/// snapshot was taken; the pool may have moved on by the time it is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PoolStatus {
    /// Whether the pool is running.
    pub running: bool,
    /// Configured number of workers.
    pub worker_count: usize,
    /// Workers waiting for a task. Zero while stopped.
    pub free_threads: usize,
    /// Workers executing a task. Zero while stopped.
    pub busy_threads: usize,
    /// Tasks submitted but not yet picked up by a worker.
    pub queued_tasks: usize,
    /// Tasks that returned normally since the pool was created.
    pub completed_tasks: u64,
    /// Tasks that panicked since the pool was created.
    pub panicked_tasks: u64,
    /// Tasks dropped unexecuted by `stop()` since the pool was created.
    pub discarded_tasks: u64,
}
