//! Concurrent executor (C4).
//!
//! A bounded work-stealing pool used exclusively for I/O-bound fan-out (directory walks, archive
//! extraction, digesting). Built on `rayon`. Submission and await go through an explicit
//! `await_all` contract so failures aggregate into one [`crate::error::Error::MultipleFailures`]
//! with deterministic ordering rather than surfacing only the first.

use crate::error::{Error, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, Ordering};

/// Default pool size: `clamp(8 * cpu_count, 4, 80)`, overridable via
/// `PROTOC_PLUGIN_EXECUTOR_THREADS` (see [`crate::config::RuntimeConfig`]).
pub fn default_pool_size() -> usize {
    (8 * num_cpus::get()).clamp(4, 80)
}

/// A cooperative cancellation flag shared between the executor and the tasks it runs. Tasks that
/// perform cancellable I/O should check [`CancellationToken::is_cancelled`] between steps.
#[derive(Clone, Default)]
pub struct CancellationToken(std::sync::Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bounded work-stealing pool for the crate's I/O fan-out.
pub struct Executor {
    pool: ThreadPool,
    cancellation: CancellationToken,
}

impl Executor {
    pub fn new(num_threads: usize) -> Self {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("protoc-plugin-worker-{i}"))
            .build()
            .expect("failed to build executor thread pool");
        Self { pool, cancellation: CancellationToken::new() }
    }

    pub fn with_default_size() -> Self {
        Self::new(default_pool_size())
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Signals cancellation to every outstanding cooperative task. Already-running
    /// non-cooperative tasks still run to completion; they are simply not retried.
    pub fn shutdown(&self) {
        self.cancellation.cancel();
    }

    /// Runs every task to completion in parallel, preserving submission order in the success
    /// output. If any task fails, every observed failure is aggregated into one
    /// [`Error::MultipleFailures`] (primary = first failure by submission index, remainder
    /// carried as suppressed causes in submission order).
    pub fn await_all<T, F>(&self, tasks: Vec<F>) -> Result<Vec<T>>
    where
        T: Send,
        F: FnOnce(&CancellationToken) -> Result<T> + Send,
    {
        use rayon::prelude::*;

        let cancellation = &self.cancellation;
        let results: Vec<Result<T>> =
            self.pool.install(|| tasks.into_par_iter().map(|task| task(cancellation)).collect());

        let mut oks = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(value) => {
                    if failures.is_empty() {
                        oks.push(value);
                    }
                }
                Err(err) => failures.push(err),
            }
        }

        if failures.is_empty() {
            Ok(oks)
        } else {
            Err(Error::aggregate(failures))
        }
    }
}
