use std::any::Any;
use std::cell::RefCell;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crossbeam::utils::Backoff;
use log::{debug, error};

use crate::queue::Task;
use crate::state::{Next, Outcome, Shared, WorkerId};

thread_local! {
    /// The pool this thread works for. Dangling on non-worker threads.
    static OWNER: RefCell<Weak<Shared>> = RefCell::new(Weak::new());
}

/// Whether the calling thread is a worker of the pool owning `shared`.
pub(crate) fn is_worker_of(shared: &Arc<Shared>) -> bool {
    OWNER.with(|owner| ptr::eq(owner.borrow().as_ptr(), Arc::as_ptr(shared)))
}

/// Spawns worker `id` as a named OS thread.
pub(crate) fn spawn_worker(
    id: WorkerId,
    name_prefix: &str,
    shared: Arc<Shared>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-{}", name_prefix, id.index))
        .spawn(move || {
            OWNER.with(|owner| *owner.borrow_mut() = Arc::downgrade(&shared));
            run(id, &shared)
        })
}

/// The worker loop: take a task, run it outside the lock, go idle, repeat.
///
/// An empty queue is polled a few times with exponential backoff, after which
/// the worker sleeps on the work signal until a task is enqueued or the pool
/// stops.
fn run(id: WorkerId, shared: &Shared) {
    debug!("Worker {} started", id.index);
    let backoff = Backoff::new();

    loop {
        let seen = shared.work.epoch();
        match shared.next_task(id) {
            Next::Run(task) => {
                backoff.reset();
                shared.progress.notify_all();

                let outcome = execute(id.index, task);

                shared.finish_task(id, outcome);
                shared.progress.notify_all();
            }
            Next::Idle => {
                if backoff.is_completed() {
                    shared.work.wait(seen);
                    backoff.reset();
                } else {
                    backoff.snooze();
                }
            }
            Next::Exit => break,
        }
    }

    debug!("Worker {}: pool stopped, shutting down", id.index);
}

/// Runs a task to completion, catching a panic so the worker survives it.
fn execute(id: usize, task: Task) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(()) => Outcome::Completed,
        Err(payload) => {
            error!(
                "Worker {id} task panicked, continuing: {}",
                panic_message(payload.as_ref())
            );
            Outcome::Panicked
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}
