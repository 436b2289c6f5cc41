use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::sync::WaitGroup;
use workpool::{Result, ThreadPool, WorkerPool};

mod common;

use common::init_logger;

fn spawn_counter<P: ThreadPool>(pool: P) -> Result<()> {
    const TASK_NUM: usize = 20;
    const ADD_COUNT: usize = 1000;

    let wg = WaitGroup::new();
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..TASK_NUM {
        let counter = Arc::clone(&counter);
        let wg = wg.clone();
        pool.spawn(move || {
            for _ in 0..ADD_COUNT {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            drop(wg);
        })
    }
    wg.wait();
    assert_eq!(counter.load(Ordering::SeqCst), TASK_NUM * ADD_COUNT);
    Ok(())
}

fn spawn_panic_task<P: ThreadPool>() -> Result<()> {
    const TASK_NUM: usize = 1000;

    let pool = P::new(4)?;
    for _ in 0..TASK_NUM {
        pool.spawn(move || {
            panic_control::disable_hook_in_current_thread();
            panic!();
        })
    }

    spawn_counter(pool)
}

#[test]
fn worker_pool_spawn_counter() -> Result<()> {
    init_logger();
    let pool = <WorkerPool as ThreadPool>::new(4)?;
    assert!(pool.is_running());
    spawn_counter(pool)
}

#[test]
fn worker_pool_panic_task() -> Result<()> {
    init_logger();
    spawn_panic_task::<WorkerPool>()
}

#[test]
fn trait_new_rejects_zero_threads() {
    init_logger();
    assert!(<WorkerPool as ThreadPool>::new(0).is_err());
}

#[test]
fn spawn_on_stopped_pool_drops_the_job() -> Result<()> {
    init_logger();
    let pool = <WorkerPool as ThreadPool>::new(2)?;
    pool.stop();

    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    pool.spawn(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });

    pool.run()?;
    pool.wait();
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    Ok(())
}
