use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use workpool::{Result, WorkerPool};

mod common;

use common::init_logger;

#[test]
fn panicking_tasks_do_not_shrink_the_pool() -> Result<()> {
    init_logger();
    let pool = WorkerPool::new(2);
    pool.run()?;
    let counter = Arc::new(AtomicUsize::new(0));

    for i in 0..20 {
        if i % 4 == 0 {
            pool.submit(move || {
                panic_control::disable_hook_in_current_thread();
                panic!("task {} failed", i);
            })?;
        } else {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })?;
        }
    }
    pool.wait();

    assert_eq!(counter.load(Ordering::SeqCst), 15);
    let status = pool.status();
    assert_eq!(status.panicked_tasks, 5);
    assert_eq!(status.completed_tasks, 15);
    assert_eq!(status.free_threads, 2);
    assert_eq!(status.busy_threads, 0);
    Ok(())
}

#[test]
fn single_worker_survives_every_task_panicking() -> Result<()> {
    init_logger();
    let pool = WorkerPool::new(1);
    pool.run()?;

    for _ in 0..10 {
        pool.submit(|| {
            panic_control::disable_hook_in_current_thread();
            std::panic::panic_any(42_u32);
        })?;
    }
    pool.wait();

    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    pool.submit(move || {
        c.fetch_add(1, Ordering::SeqCst);
    })?;
    pool.wait();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(pool.status().panicked_tasks, 10);
    assert_eq!(pool.free_threads_count(), 1);

    // Workers still stop cleanly after catching panics.
    pool.stop();
    assert!(!pool.is_running());
    Ok(())
}
