use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::SubmitPolicy;
use crate::queue::{Task, TaskQueue};
use crate::signal::Signal;
use crate::status::PoolStatus;

/// Lifecycle of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PoolState {
    Stopped,
    Running,
}

/// Whether a worker is executing a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerState {
    Idle,
    Busy,
}

/// How a task left its worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Completed,
    Panicked,
}

/// Identifies a worker within one run of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WorkerId {
    pub(crate) index: usize,
    /// The run this worker was spawned for.
    pub(crate) generation: u64,
}

/// What a worker should do next.
pub(crate) enum Next {
    Run(Task),
    Idle,
    Exit,
}

/// Everything guarded by the pool lock.
pub(crate) struct State {
    pub(crate) lifecycle: PoolState,
    /// Bumped by every `run()`.
    pub(crate) generation: u64,
    pub(crate) worker_count: usize,
    pub(crate) queue: TaskQueue,
    /// One flag per spawned worker, indexed by worker id. Empty while stopped.
    pub(crate) workers: Vec<WorkerState>,
    pub(crate) completed: u64,
    pub(crate) panicked: u64,
    pub(crate) discarded: u64,
}

impl State {
    fn new(worker_count: usize) -> Self {
        Self {
            lifecycle: PoolState::Stopped,
            generation: 0,
            worker_count,
            queue: TaskQueue::default(),
            workers: Vec::new(),
            completed: 0,
            panicked: 0,
            discarded: 0,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.lifecycle == PoolState::Running
    }

    /// Whether `id` belongs to the current run of a running pool.
    fn is_current(&self, id: WorkerId) -> bool {
        self.is_running() && self.generation == id.generation
    }

    fn flag_mut(&mut self, id: WorkerId) -> Option<&mut WorkerState> {
        if self.generation == id.generation {
            self.workers.get_mut(id.index)
        } else {
            None
        }
    }

    pub(crate) fn count(&self, wanted: WorkerState) -> usize {
        self.workers.iter().filter(|&&s| s == wanted).count()
    }

    pub(crate) fn any(&self, wanted: WorkerState) -> bool {
        self.workers.iter().any(|&s| s == wanted)
    }

    /// The queue is empty and no worker is busy.
    pub(crate) fn is_drained(&self) -> bool {
        self.queue.is_empty() && !self.any(WorkerState::Busy)
    }

    /// Whether `policy` lets one more task into the queue right now.
    pub(crate) fn admits(&self, policy: SubmitPolicy) -> bool {
        match policy {
            SubmitPolicy::Unbounded => true,
            SubmitPolicy::Bounded(capacity) => self.queue.len() < capacity,
            SubmitPolicy::FreeWorker => self.queue.len() < self.count(WorkerState::Idle),
        }
    }

    pub(crate) fn status(&self) -> PoolStatus {
        PoolStatus {
            running: self.is_running(),
            worker_count: self.worker_count,
            free_threads: self.count(WorkerState::Idle),
            busy_threads: self.count(WorkerState::Busy),
            queued_tasks: self.queue.len(),
            completed_tasks: self.completed,
            panicked_tasks: self.panicked,
            discarded_tasks: self.discarded,
        }
    }
}

/// State shared between the controller and its workers.
pub(crate) struct Shared {
    state: RwLock<State>,
    /// Notified on enqueue and on stop. Idle workers sleep on it.
    pub(crate) work: Signal,
    /// Notified on dequeue, on a worker going idle and on stop. Drain waiters
    /// and blocked submitters sleep on it.
    pub(crate) progress: Signal,
}

impl Shared {
    pub(crate) fn new(worker_count: usize) -> Self {
        Self {
            state: RwLock::new(State::new(worker_count)),
            work: Signal::new(),
            progress: Signal::new(),
        }
    }

    // Tasks never run under the lock, so poisoning can only come from a bug
    // in the pool itself; the state is still consistent in that case.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands the head task to worker `id`, marking it busy.
    ///
    /// Workers of an earlier run are told to exit even if the pool has been
    /// started again since.
    pub(crate) fn next_task(&self, id: WorkerId) -> Next {
        {
            let state = self.read();
            if !state.is_current(id) {
                return Next::Exit;
            }
            if state.queue.is_empty() {
                return Next::Idle;
            }
        }

        let mut state = self.write();
        if !state.is_current(id) {
            return Next::Exit;
        }
        match state.queue.try_dequeue() {
            Some(task) => {
                if let Some(flag) = state.flag_mut(id) {
                    *flag = WorkerState::Busy;
                }
                Next::Run(task)
            }
            // Another worker won the race between the two locks.
            None => Next::Idle,
        }
    }

    /// Marks worker `id` idle again after its task ended.
    pub(crate) fn finish_task(&self, id: WorkerId, outcome: Outcome) {
        let mut state = self.write();
        if let Some(flag) = state.flag_mut(id) {
            *flag = WorkerState::Idle;
        }
        match outcome {
            Outcome::Completed => state.completed += 1,
            Outcome::Panicked => state.panicked += 1,
        }
    }
}
