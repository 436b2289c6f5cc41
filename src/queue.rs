use std::collections::VecDeque;
use std::mem;

use sync_wrapper::SyncWrapper;

/// A unit of work: a zero-argument closure with no result.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// FIFO queue of pending tasks.
///
/// The queue itself is not synchronized; it lives inside the pool state and
/// is only touched under the pool's lock. Tasks are `Send` but not `Sync`, so
/// each one sits in a `SyncWrapper` to let readers share the queue.
#[derive(Default)]
pub(crate) struct TaskQueue {
    tasks: VecDeque<SyncWrapper<Task>>,
}

impl TaskQueue {
    pub(crate) fn enqueue(&mut self, task: Task) {
        self.tasks.push_back(SyncWrapper::new(task));
    }

    pub(crate) fn try_dequeue(&mut self) -> Option<Task> {
        self.tasks.pop_front().map(SyncWrapper::into_inner)
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Moves every pending task out, leaving the queue empty.
    ///
    /// Callers drop the returned queue after releasing the lock, since a
    /// task's captured state may do arbitrary work on drop.
    pub(crate) fn take(&mut self) -> TaskQueue {
        mem::take(self)
    }
}
