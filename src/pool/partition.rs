//! Static work partitioning: each worker gets one contiguous slice.
//!
//! The simplest distribution strategy the dispatcher supports. Chunks are
//! fixed up front, so it suits homogeneous task costs; uneven costs are
//! what [`crate::pool::stealing`] is for.

use std::ops::Range;

use crate::task::panic_message;
use crate::{Error, Result};

/// Split `0..total` into `workers` contiguous ranges.
///
/// The remainder is spread one extra element at a time over the leading
/// chunks, so chunk lengths differ by at most one and every index is
/// covered exactly once. Workers beyond `total` get empty ranges.
///
/// # Errors
///
/// Returns `Error::InvalidWorkerCount` for a zero worker count.
pub fn partition(total: usize, workers: usize) -> Result<Vec<Range<usize>>> {
    if workers == 0 {
        return Err(Error::InvalidWorkerCount);
    }
    let base = total / workers;
    let extra = total % workers;
    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for w in 0..workers {
        let len = base + usize::from(w < extra);
        ranges.push(start..start + len);
        start += len;
    }
    Ok(ranges)
}

/// Apply `f` to every item, one scoped thread per chunk.
///
/// Results come back concatenated in input order regardless of which
/// thread processed which chunk.
pub fn dispatch_chunked<T, R, F>(items: &[T], workers: usize, f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let ranges = partition(items.len(), workers)?;
    let mut results = Vec::with_capacity(items.len());
    std::thread::scope(|s| -> Result<()> {
        let handles: Vec<_> = ranges
            .into_iter()
            .map(|range| {
                let f = &f;
                s.spawn(move || items[range].iter().map(f).collect::<Vec<R>>())
            })
            .collect();
        for handle in handles {
            let chunk = handle
                .join()
                .map_err(|payload| Error::WorkerPanic(panic_message(payload)))?;
            results.extend(chunk);
        }
        Ok(())
    })?;
    Ok(results)
}
