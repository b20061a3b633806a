//! Shared counters: unsynchronized, mutex-guarded, and atomic.
//!
//! Three explicit code paths for the same experiment: N workers each
//! incrementing a shared counter M times. The racy path loses updates;
//! the other two never do. Counters are plain state objects so each test
//! or demo can own an independent instance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Barrier, Mutex};

use crate::{Error, Result};

/// A counter that can be incremented concurrently from many workers.
pub trait SharedCounter: Sync {
    /// Add one to the counter.
    fn increment(&self);

    /// Current value. Only meaningful once all workers have finished.
    fn value(&self) -> u64;
}

/// Unsynchronized read-modify-write counter.
///
/// The increment is split into a relaxed load and a relaxed store, so two
/// workers can read the same value and overwrite each other's update.
/// The lost update is the observable property: after N workers do M
/// increments the value is at most `N * M` and usually below it. This is
/// deliberately broken; use [`MutexCounter`] or [`AtomicCounter`] for a
/// correct count.
#[derive(Debug, Default)]
pub struct RacyCounter {
    value: AtomicU64,
}

impl RacyCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedCounter for RacyCounter {
    fn increment(&self) {
        let v = self.value.load(Ordering::Relaxed);
        // Widen the read-to-write window so the lost update shows up
        // reliably even on lightly loaded machines.
        std::hint::spin_loop();
        self.value.store(v + 1, Ordering::Relaxed);
    }

    fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counter guarded by a mutex; the whole read-modify-write happens inside
/// the critical section.
#[derive(Debug, Default)]
pub struct MutexCounter {
    value: Mutex<u64>,
}

impl MutexCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedCounter for MutexCounter {
    fn increment(&self) {
        let mut guard = self.value.lock().unwrap_or_else(|e| e.into_inner());
        *guard += 1;
    }

    fn value(&self) -> u64 {
        *self.value.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Lock-free counter; the increment is a single indivisible step.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedCounter for AtomicCounter {
    fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Run the increment experiment: `workers` threads each incrementing the
/// counter `increments` times.
///
/// Workers start behind a barrier so every run maximally overlaps; without
/// the gate a fast thread can finish before the next one even starts and
/// the racy path would look correct.
pub fn run_increments<C>(counter: &C, workers: usize, increments: usize) -> Result<()>
where
    C: SharedCounter + ?Sized,
{
    if workers == 0 {
        return Err(Error::InvalidWorkerCount);
    }
    let gate = Barrier::new(workers);
    let gate = &gate;
    std::thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(move || {
                gate.wait();
                for _ in 0..increments {
                    counter.increment();
                }
            });
        }
    });
    Ok(())
}
