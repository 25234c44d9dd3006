//! Bounded-concurrency map over a slice, on a dedicated rayon pool.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use rayon::ThreadPoolBuilder;

use super::dispatch::{Dispatch, HaltOnPanic};
use crate::error::MapError;

/// Runs a worker over every item with at most `concurrency` calls in flight.
///
/// Results come back in input order. The first worker error stops any new
/// items from being claimed; calls already running finish, and their errors
/// are discarded. See [`MapError`] for the non-determinism this implies.
#[derive(Clone, Debug)]
pub struct BoundedMapper {
    concurrency: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl BoundedMapper {
    /// Create a mapper. A concurrency of 0 is treated as 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            cancel: None,
        }
    }

    /// Stop claiming new items once `flag` is set. In-flight calls are not aborted.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Requested concurrency (after the lower clamp to 1).
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Number of workers dispatched for `len` items: `max(1, min(concurrency, len))`.
    pub fn worker_count(&self, len: usize) -> usize {
        self.concurrency.min(len).max(1)
    }

    pub(crate) fn cancel_flag(&self) -> Option<Arc<AtomicBool>> {
        self.cancel.clone()
    }

    /// Map `worker` over `items` on a rayon pool sized to the worker count.
    ///
    /// An empty slice returns immediately without building a pool. A
    /// panicking worker halts the cursor; rayon re-raises the panic here once
    /// every other worker has returned.
    pub fn run<T, U, E, F>(&self, items: &[T], worker: F) -> Result<Vec<U>, MapError<E>>
    where
        T: Sync,
        U: Send,
        E: Send,
        F: Fn(&T, usize) -> Result<U, E> + Sync,
    {
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let workers = self.worker_count(total);
        debug!("mapping {} items with {} workers", total, workers);

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("summa-worker-{}", i))
            .build()?;
        let dispatch = Dispatch::new(total, self.cancel_flag());
        let results = Mutex::new(Vec::with_capacity(total));
        pool.scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| {
                    let part = drain(&dispatch, items, &worker);
                    results
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend(part);
                });
            }
        });

        dispatch.finish(results.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}

fn drain<T, U, E, F>(dispatch: &Dispatch<E>, items: &[T], worker: &F) -> Vec<(usize, U)>
where
    F: Fn(&T, usize) -> Result<U, E>,
{
    let _guard = HaltOnPanic(dispatch);
    let mut done = Vec::new();
    while let Some(index) = dispatch.claim() {
        match worker(&items[index], index) {
            Ok(value) => done.push((index, value)),
            Err(error) => dispatch.fail(index, error),
        }
    }
    done
}

/// Shorthand for `BoundedMapper::new(concurrency).run(items, worker)`.
pub fn map_limit<T, U, E, F>(items: &[T], concurrency: usize, worker: F) -> Result<Vec<U>, MapError<E>>
where
    T: Sync,
    U: Send,
    E: Send,
    F: Fn(&T, usize) -> Result<U, E> + Sync,
{
    BoundedMapper::new(concurrency).run(items, worker)
}
