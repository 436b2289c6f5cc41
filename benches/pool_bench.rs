use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use crossbeam_utils::sync::WaitGroup;
use workpool::{PoolConfig, Result, SubmitPolicy, ThreadPool, WorkerPool};

const TASKS: usize = 1000;

/// A `rayon` pool behind the same trait, as a baseline.
struct RayonThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool for RayonThreadPool {
    fn new(threads: u32) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .build()
            .map_err(|e| workpool::PoolError::InvalidConfig(e.to_string()))?;
        Ok(RayonThreadPool { pool })
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }
}

fn run_tasks<P: ThreadPool>(pool: &P) {
    let wg = WaitGroup::new();
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..TASKS {
        let counter = Arc::clone(&counter);
        let wg = wg.clone();
        pool.spawn(move || {
            counter.fetch_add(1, Ordering::Relaxed);
            drop(wg);
        });
    }
    wg.wait();
}

fn spawn_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");
    let threads = num_cpus::get() as u32;

    let worker_pool = <WorkerPool as ThreadPool>::new(threads).unwrap();
    group.bench_function("worker_pool", |b| b.iter(|| run_tasks(&worker_pool)));

    let rayon_pool = RayonThreadPool::new(threads).unwrap();
    group.bench_function("rayon", |b| b.iter(|| run_tasks(&rayon_pool)));

    group.finish();
}

fn policy_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_policy");
    let workers = num_cpus::get();

    for (name, policy) in [
        ("unbounded", SubmitPolicy::Unbounded),
        ("bounded", SubmitPolicy::Bounded(64)),
        ("free_worker", SubmitPolicy::FreeWorker),
    ] {
        let pool = WorkerPool::with_config(PoolConfig::new(workers).with_submit_policy(policy));
        pool.run().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &pool, |b, pool| {
            b.iter(|| {
                for _ in 0..TASKS {
                    pool.submit(|| {}).unwrap();
                }
                pool.wait();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, spawn_bench, policy_bench);
criterion_main!(benches);
