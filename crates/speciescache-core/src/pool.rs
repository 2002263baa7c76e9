//! Bounded concurrency executor.
//!
//! `run_pool` drives a fixed number of cooperative lanes over a slice. Each
//! lane pulls the next index from a shared cursor until the slice is
//! exhausted, so every item is handed to the worker exactly once. Lanes are
//! interleaved futures on the calling task, not spawned threads.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;

/// Run `worker(item, index)` over `items` with `concurrency` lanes
/// (clamped to at least one).
///
/// Worker errors are not caught here: an `Err` ends the lane that produced
/// it while the remaining lanes keep draining the cursor. Once every lane has
/// settled, the first error (in lane order) is returned. Workers that need
/// per-item fault isolation must handle failures themselves and return `Ok`.
pub async fn run_pool<'a, T, E, F, Fut>(
    items: &'a [T],
    concurrency: usize,
    worker: F,
) -> Result<(), E>
where
    F: Fn(&'a T, usize) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let lanes = concurrency.max(1);
    let cursor = AtomicUsize::new(0);
    let cursor = &cursor;
    let worker = &worker;

    let runners = (0..lanes).map(|_| async move {
        loop {
            let idx = cursor.fetch_add(1, Ordering::SeqCst);
            if idx >= items.len() {
                return Ok::<(), E>(());
            }
            worker(&items[idx], idx).await?;
        }
    });

    join_all(runners).await.into_iter().collect()
}
