//! Bounded-concurrency map on tokio tasks.

use std::future::Future;
use std::panic;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use tokio::task::JoinSet;

use super::bounded::BoundedMapper;
use super::dispatch::Dispatch;
use crate::error::MapError;

impl BoundedMapper {
    /// Map an async `worker` over `items` using at most `concurrency` tokio tasks.
    ///
    /// Same ordering, failure and cancellation rules as [`BoundedMapper::run`].
    /// Each claimed item is moved into its worker call. Must be awaited
    /// inside a tokio runtime.
    pub async fn run_async<T, U, E, F, Fut>(
        &self,
        items: Vec<T>,
        worker: F,
    ) -> Result<Vec<U>, MapError<E>>
    where
        T: Send + 'static,
        U: Send + 'static,
        E: Send + 'static,
        F: Fn(T, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
    {
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let workers = self.worker_count(total);
        debug!("mapping {} items with {} async workers", total, workers);

        let slots: Arc<Vec<Mutex<Option<T>>>> =
            Arc::new(items.into_iter().map(|item| Mutex::new(Some(item))).collect());
        let dispatch = Arc::new(Dispatch::new(total, self.cancel_flag()));
        let worker = Arc::new(worker);

        let mut set = JoinSet::new();
        for _ in 0..workers {
            let slots = Arc::clone(&slots);
            let dispatch = Arc::clone(&dispatch);
            let worker = Arc::clone(&worker);
            set.spawn(async move {
                let mut done = Vec::new();
                while let Some(index) = dispatch.claim() {
                    let taken = slots[index]
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .take();
                    // Each index is claimed once, so the slot is always full here.
                    let Some(item) = taken else { continue };
                    match worker(item, index).await {
                        Ok(value) => done.push((index, value)),
                        Err(error) => dispatch.fail(index, error),
                    }
                }
                done
            });
        }

        let mut results = Vec::with_capacity(total);
        let mut panicked = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(part) => results.extend(part),
                Err(err) => {
                    dispatch.halt();
                    if err.is_panic() {
                        panicked.get_or_insert(err.into_panic());
                    }
                }
            }
        }
        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }

        dispatch.finish(results)
    }
}

/// Shorthand for `BoundedMapper::new(concurrency).run_async(items, worker)`.
pub async fn map_limit_async<T, U, E, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    worker: F,
) -> Result<Vec<U>, MapError<E>>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    F: Fn(T, usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<U, E>> + Send + 'static,
{
    BoundedMapper::new(concurrency).run_async(items, worker).await
}
