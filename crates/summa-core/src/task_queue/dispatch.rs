//! Shared cursor and failure record for one bounded map call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use log::debug;

use crate::error::MapError;

struct State<E> {
    next: usize,
    halted: bool,
    failure: Option<(usize, E)>,
}

/// Hands out item indices to workers and records the first failure.
///
/// Claiming, halting and failing all go through one mutex, so once a failure
/// is recorded no worker can claim another index. The lock is never held
/// while a worker runs.
pub(crate) struct Dispatch<E> {
    len: usize,
    state: Mutex<State<E>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<E> Dispatch<E> {
    pub(crate) fn new(len: usize, cancel: Option<Arc<AtomicBool>>) -> Self {
        Self {
            len,
            state: Mutex::new(State {
                next: 0,
                halted: false,
                failure: None,
            }),
            cancel,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Claim the next unclaimed index, or `None` once the cursor is exhausted,
    /// halted by a failure, or cancelled.
    pub(crate) fn claim(&self) -> Option<usize> {
        let mut state = self.lock();
        if state.halted || state.next >= self.len {
            return None;
        }
        if self.cancelled() {
            debug!("cancel flag set; halting at index {}", state.next);
            state.halted = true;
            return None;
        }
        let index = state.next;
        state.next += 1;
        Some(index)
    }

    /// Stop issuing claims without recording a failure.
    pub(crate) fn halt(&self) {
        self.lock().halted = true;
    }

    /// Record a worker failure. Only the first one is kept.
    pub(crate) fn fail(&self, index: usize, error: E) {
        let mut state = self.lock();
        state.halted = true;
        if state.failure.is_none() {
            debug!("worker failed on item {}; no further items will be claimed", index);
            state.failure = Some((index, error));
        } else {
            debug!("discarding failure on item {} (an earlier failure was recorded)", index);
        }
    }

    /// Build the final outcome from the `(index, value)` pairs every worker
    /// returned. A recorded failure wins over everything else.
    pub(crate) fn finish<U>(&self, results: Vec<(usize, U)>) -> Result<Vec<U>, MapError<E>> {
        if let Some((index, error)) = self.lock().failure.take() {
            return Err(MapError::WorkerFailure { index, error });
        }
        let completed = results.len();
        let mut slots: Vec<Option<U>> = (0..self.len).map(|_| None).collect();
        for (index, value) in results {
            slots[index] = Some(value);
        }
        slots
            .into_iter()
            .collect::<Option<Vec<U>>>()
            .ok_or(MapError::Cancelled {
                completed,
                total: self.len,
            })
    }
}

/// Halts the dispatch if the owning worker thread unwinds.
pub(crate) struct HaltOnPanic<'a, E>(pub(crate) &'a Dispatch<E>);

impl<E> Drop for HaltOnPanic<'_, E> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.halt();
        }
    }
}
