//! Bounded worker pool for the parallel-for passes over tracks.

use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::thread;

use crate::error::Result;

pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// Sizes the pool at `multiplier` threads per available core
    pub fn new(multiplier: usize) -> Result<Self> {
        let cores = thread::available_parallelism().map_or(1, |n| n.get());
        Self::with_threads(cores * multiplier.max(1))
    }

    pub fn with_threads(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("tickstream-worker-{}", i))
            .build()?;
        debug!("Worker pool started with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `op` inside the pool; parallel iterators used by `op` are
    /// scheduled on this pool's threads. Returns once `op` and all the work
    /// it spawned has finished.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .finish()
    }
}
