//! A fixed-size worker pool for bulk data preparation and batch
//! verification.
//!
//! [`parallel_map`] partitions the output indices by stride: worker `i` of
//! `w` computes indices `i, i + w, i + 2w, …`. Workers own disjoint output
//! slots and only meet at the final join, so the result order never depends
//! on scheduling.

use crate::errors::{InternalError, Result};
use std::{
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    thread,
};
use tracing::{debug, error};

/// Number of workers to use when the caller has no preference.
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Compute `f(0), …, f(len - 1)` on up to `workers` threads.
///
/// The first error returned by any call is returned; once it is recorded
/// the remaining workers stop picking up new indices. A panicking worker
/// surfaces as [`InternalError::InternalInvariantFailed`] rather than
/// unwinding into the caller.
pub fn parallel_map<T, F>(len: usize, workers: usize, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync,
{
    let workers = workers.clamp(1, len.max(1));
    debug!("Running {len} tasks on {workers} workers");

    let cancelled = AtomicBool::new(false);
    let first_error: Mutex<Option<InternalError>> = Mutex::new(None);
    let record_error = |e: InternalError| {
        cancelled.store(true, Ordering::Relaxed);
        if let Ok(mut slot) = first_error.lock() {
            slot.get_or_insert(e);
        }
    };

    let mut slots: Vec<Option<T>> = Vec::with_capacity(len);
    slots.resize_with(len, || None);

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let f = &f;
                let cancelled = &cancelled;
                let record_error = &record_error;
                scope.spawn(move || {
                    let mut produced = Vec::with_capacity(len / workers + 1);
                    for index in (worker..len).step_by(workers) {
                        if cancelled.load(Ordering::Relaxed) {
                            break;
                        }
                        match f(index) {
                            Ok(value) => produced.push((index, value)),
                            Err(e) => {
                                record_error(e);
                                break;
                            }
                        }
                    }
                    produced
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(produced) => {
                    for (index, value) in produced {
                        slots[index] = Some(value);
                    }
                }
                Err(_) => {
                    error!("A worker thread panicked");
                    record_error(InternalError::InternalInvariantFailed);
                }
            }
        }
    });

    let recorded = first_error
        .into_inner()
        .map_err(|_| InternalError::InternalInvariantFailed)?;
    if let Some(e) = recorded {
        return Err(e);
    }
    slots.into_iter().collect::<Option<Vec<T>>>().ok_or_else(|| {
        error!("A parallel task finished without producing its result");
        InternalError::InternalInvariantFailed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CallerError;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn results_follow_index_order() {
        for workers in [1, 3, 8, 100] {
            let squares = parallel_map(37, workers, |i| Ok(i * i)).unwrap();
            assert_eq!(squares, (0..37).map(|i| i * i).collect::<Vec<_>>());
        }
        assert!(parallel_map(0, 4, |i| Ok(i)).unwrap().is_empty());
    }

    #[test]
    fn first_error_is_returned_and_work_stops() {
        let calls = AtomicUsize::new(0);
        let result = parallel_map(10_000, 1, |i| {
            calls.fetch_add(1, Ordering::Relaxed);
            if i == 5 {
                Err(CallerError::BadInput)?
            }
            Ok(i)
        });
        assert_eq!(
            result.unwrap_err(),
            InternalError::CallingApplicationMistake(CallerError::BadInput)
        );
        assert_eq!(calls.load(Ordering::Relaxed), 6);
    }

    #[test]
    fn panicking_worker_becomes_an_error() {
        let result = parallel_map(8, 2, |i| {
            if i == 3 {
                panic!("worker failure");
            }
            Ok(i)
        });
        assert_eq!(result.unwrap_err(), InternalError::InternalInvariantFailed);
    }
}
