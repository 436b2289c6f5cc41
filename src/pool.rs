use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::utils::Backoff;
use log::{debug, error};

use crate::config::PoolConfig;
use crate::queue::Task;
use crate::state::{PoolState, Shared, WorkerId, WorkerState};
use crate::status::PoolStatus;
use crate::worker::{is_worker_of, spawn_worker};
use crate::{PoolError, Result};

/// A fixed-size pool of worker threads fed from one FIFO task queue.
///
/// A pool starts out stopped. [`run`](Self::run) spawns the workers,
/// [`submit`](Self::submit) hands them fire-and-forget tasks, and
/// [`stop`](Self::stop) joins them again. The pool can be run and stopped any
/// number of times; dropping it stops it.
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use workpool::WorkerPool;
///
/// let pool = WorkerPool::new(4);
/// pool.run()?;
///
/// let counter = Arc::new(AtomicUsize::new(0));
/// for _ in 0..10 {
///     let counter = Arc::clone(&counter);
///     pool.submit(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })?;
/// }
/// pool.wait();
/// assert_eq!(counter.load(Ordering::SeqCst), 10);
/// # Ok::<(), workpool::PoolError>(())
/// ```
///
/// # Limitations
///
/// A task that never returns occupies its worker forever, and `wait()` and
/// `stop()` block forever behind it. Calling `wait()` or `reset()` from inside
/// a task deadlocks, since the calling worker is itself busy. A task may call
/// `stop()`; its own worker is then left to exit once the task returns. A task
/// that calls `stop()`, `run()` or `set_worker_count()` while another thread
/// is stopping the pool does not wait for that thread, which may be joining
/// the task's own worker.
pub struct WorkerPool {
    config: PoolConfig,
    shared: Arc<Shared>,
    /// Join handles of the current run. The mutex also serializes lifecycle
    /// transitions, so `run()` never overlaps a `stop()` still joining and a
    /// second `stop()` returns only once the workers are joined.
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Creates a stopped pool with `worker_count` workers and default settings.
    pub fn new(worker_count: usize) -> Self {
        Self::with_config(PoolConfig::new(worker_count))
    }

    /// Creates a stopped pool from a full configuration.
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(config.worker_count)),
            handles: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Spawns the workers and starts processing tasks.
    ///
    /// Does nothing if the pool is already running.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NoWorkers`] if the worker count is zero,
    /// [`PoolError::InvalidConfig`] for an unusable configuration, and
    /// [`PoolError::Io`] if a thread cannot be spawned. On error the pool is
    /// left stopped. Called from a task while another thread is stopping the
    /// pool, returns [`PoolError::Stopping`].
    pub fn run(&self) -> Result<()> {
        let mut handles = match self.lock_lifecycle() {
            Some(handles) => handles,
            None => return Err(PoolError::Stopping),
        };

        let (worker_count, generation) = {
            let mut state = self.shared.write();
            if state.is_running() {
                debug!("run() on a running pool ignored");
                return Ok(());
            }
            if state.worker_count == 0 {
                return Err(PoolError::NoWorkers);
            }
            self.config.validate()?;

            state.workers = vec![WorkerState::Idle; state.worker_count];
            state.lifecycle = PoolState::Running;
            state.generation += 1;
            (state.worker_count, state.generation)
        };

        for index in 0..worker_count {
            let id = WorkerId { index, generation };
            match spawn_worker(id, &self.config.thread_name, Arc::clone(&self.shared)) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!("Failed to spawn worker {index}: {e}");
                    self.shutdown(&mut handles);
                    return Err(e.into());
                }
            }
        }

        debug!("Pool running with {worker_count} workers");
        Ok(())
    }

    /// Stops the pool and joins every worker.
    ///
    /// Tasks already picked up by a worker run to completion. **Tasks still
    /// queued are discarded without running**; call [`wait`](Self::wait)
    /// first to let them finish. Does nothing if the pool is already stopped.
    ///
    /// Concurrent callers are serialized: every `stop()` returns only after
    /// the workers have been joined.
    pub fn stop(&self) {
        match self.lock_lifecycle() {
            Some(mut handles) => self.shutdown(&mut handles),
            None => debug!("stop() from a task while the pool is stopping ignored"),
        }
    }

    /// Blocks until the queue is empty and every worker is idle.
    ///
    /// The lifecycle state is unchanged. Returns immediately when the pool is
    /// stopped. Tasks submitted by other threads while waiting are waited for
    /// as well; the drain condition is re-checked on every worker wakeup and
    /// at least once per configured drain poll interval.
    pub fn wait(&self) {
        self.drain(None);
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`.
    ///
    /// Returns `true` if the pool drained (or is stopped) in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.drain(Some(Instant::now() + timeout))
    }

    /// Waits for the pool to drain, stops it, and clears the worker count.
    ///
    /// Afterwards the pool is stopped and unconfigured: set a new worker count
    /// with [`set_worker_count`](Self::set_worker_count) before running again.
    pub fn reset(&self) {
        self.wait();
        let mut handles = self.lock_handles();
        self.shutdown(&mut handles);
        self.shared.write().worker_count = 0;
        debug!("Pool reset");
    }

    /// Submits a task for asynchronous execution.
    ///
    /// Under the default unbounded policy this never blocks. Under a bounded or
    /// free-worker policy it blocks until the task is admitted.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NotRunning`] if the pool is stopped, including when
    /// it stops while this call is blocked. The task is dropped unexecuted.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(task), true)
    }

    /// Submits a task without ever blocking.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NotRunning`] if the pool is stopped and
    /// [`PoolError::QueueFull`] if the submit policy would make
    /// [`submit`](Self::submit) block. The task is dropped in both cases.
    pub fn try_submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(task), false)
    }

    /// Changes the number of workers spawned by the next `run()`.
    ///
    /// Only allowed while stopped; on a running pool this does nothing and
    /// returns `false`. Also returns `false` when called from a task while
    /// another thread is stopping the pool.
    pub fn set_worker_count(&self, worker_count: usize) -> bool {
        let _handles = match self.lock_lifecycle() {
            Some(handles) => handles,
            None => {
                debug!("set_worker_count({worker_count}) from a task during stop ignored");
                return false;
            }
        };
        let mut state = self.shared.write();
        if state.is_running() {
            debug!("set_worker_count({worker_count}) on a running pool ignored");
            return false;
        }
        state.worker_count = worker_count;
        true
    }

    /// Configured number of workers.
    pub fn worker_count(&self) -> usize {
        self.shared.read().worker_count
    }

    /// Whether the pool is running.
    pub fn is_running(&self) -> bool {
        self.shared.read().is_running()
    }

    /// Whether any worker is idle.
    pub fn is_free_thread(&self) -> bool {
        self.shared.read().any(WorkerState::Idle)
    }

    /// Whether any worker is executing a task.
    pub fn is_busy_thread(&self) -> bool {
        self.shared.read().any(WorkerState::Busy)
    }

    /// Number of idle workers.
    pub fn free_threads_count(&self) -> usize {
        self.shared.read().count(WorkerState::Idle)
    }

    /// Number of workers executing a task.
    pub fn busy_threads_count(&self) -> usize {
        self.shared.read().count(WorkerState::Busy)
    }

    /// Number of tasks waiting for a worker.
    pub fn tasks_queue_size(&self) -> usize {
        self.shared.read().queue.len()
    }

    /// All status fields read under one lock.
    pub fn status(&self) -> PoolStatus {
        self.shared.read().status()
    }

    /// The configuration this pool was built with.
    ///
    /// `worker_count` here is the initial count; see
    /// [`worker_count`](Self::worker_count) for the current one.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn push(&self, task: Task, block: bool) -> Result<()> {
        loop {
            let seen = self.shared.progress.epoch();
            {
                let mut state = self.shared.write();
                if !state.is_running() {
                    return Err(PoolError::NotRunning);
                }
                if state.admits(self.config.submit_policy) {
                    state.queue.enqueue(task);
                    drop(state);
                    self.shared.work.notify_one();
                    return Ok(());
                }
            }
            if !block {
                return Err(PoolError::QueueFull);
            }
            self.shared.progress.wait(seen);
        }
    }

    fn drain(&self, deadline: Option<Instant>) -> bool {
        loop {
            let seen = self.shared.progress.epoch();
            {
                let state = self.shared.read();
                if !state.is_running() || state.is_drained() {
                    return true;
                }
            }

            let mut interval = self.config.drain_poll_interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return false;
                }
                interval = interval.min(deadline - now);
            }
            self.shared.progress.wait_timeout(seen, interval);
        }
    }

    /// Transitions to stopped, discards pending tasks and joins the workers.
    fn shutdown(&self, handles: &mut Vec<JoinHandle<()>>) {
        let pending = {
            let mut state = self.shared.write();
            if !state.is_running() {
                debug!("stop() on a stopped pool ignored");
                return;
            }
            state.lifecycle = PoolState::Stopped;
            let pending = state.queue.take();
            state.discarded += pending.len() as u64;
            pending
        };
        let discarded = pending.len();
        drop(pending);

        self.shared.work.notify_all();
        self.shared.progress.notify_all();

        let current = thread::current().id();
        for handle in handles.drain(..) {
            // A task stopping its own pool cannot join its own worker; that
            // worker exits on its own once the task returns.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("Worker thread panicked outside of a task");
            }
        }

        self.shared.write().workers.clear();
        debug!("Pool stopped, {discarded} pending tasks discarded");
    }

    fn lock_handles(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the lifecycle lock.
    ///
    /// Threads outside the pool block for it. A worker must not: the holder
    /// may be a `stop()` joining that very worker. Workers spin on the lock
    /// instead and give up with `None` once the pool is no longer running.
    fn lock_lifecycle(&self) -> Option<MutexGuard<'_, Vec<JoinHandle<()>>>> {
        if !is_worker_of(&self.shared) {
            return Some(self.lock_handles());
        }

        let backoff = Backoff::new();
        loop {
            match self.handles.try_lock() {
                Ok(handles) => return Some(handles),
                Err(TryLockError::Poisoned(e)) => return Some(e.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if !self.is_running() {
                        return None;
                    }
                    backoff.snooze();
                }
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}
