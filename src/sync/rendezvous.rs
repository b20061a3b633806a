//! Barrier rendezvous: all workers arrive before any proceeds.
//!
//! Each worker sleeps its own duration, records an arrival timestamp,
//! waits at the barrier, then records a resume timestamp. All-or-none
//! release means no resume can precede the last arrival.

use std::sync::Barrier;
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Timestamps collected from one rendezvous run, indexed by worker.
#[derive(Debug)]
pub struct RendezvousReport {
    arrivals: Vec<Instant>,
    resumes: Vec<Instant>,
    max_arrival: Instant,
    min_resume: Instant,
}

impl RendezvousReport {
    fn new(arrivals: Vec<Instant>, resumes: Vec<Instant>) -> Self {
        // Both vecs are non-empty; rendezvous() rejects zero workers.
        let max_arrival = arrivals.iter().copied().fold(arrivals[0], Instant::max);
        let min_resume = resumes.iter().copied().fold(resumes[0], Instant::min);
        Self {
            arrivals,
            resumes,
            max_arrival,
            min_resume,
        }
    }

    /// Number of workers that took part.
    pub fn workers(&self) -> usize {
        self.arrivals.len()
    }

    /// When this worker reached the barrier.
    pub fn arrival(&self, worker: usize) -> Instant {
        self.arrivals[worker]
    }

    /// When this worker resumed past the barrier.
    pub fn resume(&self, worker: usize) -> Instant {
        self.resumes[worker]
    }

    /// The latest pre-barrier arrival across all workers.
    pub fn max_arrival(&self) -> Instant {
        self.max_arrival
    }

    /// The earliest post-barrier resume across all workers.
    pub fn min_resume(&self) -> Instant {
        self.min_resume
    }

    /// The rendezvous invariant: no worker resumed before the last
    /// worker arrived.
    pub fn holds(&self) -> bool {
        self.max_arrival <= self.min_resume
    }
}

/// Run one rendezvous with one worker per entry in `durations`.
///
/// Worker `i` sleeps `durations[i]`, stamps its arrival, waits for the
/// others, and stamps its resume.
///
/// # Errors
///
/// Returns `Error::InvalidWorkerCount` when `durations` is empty.
pub fn rendezvous(durations: &[Duration]) -> Result<RendezvousReport> {
    if durations.is_empty() {
        return Err(Error::InvalidWorkerCount);
    }

    let workers = durations.len();
    let barrier = Barrier::new(workers);
    let barrier = &barrier;
    let (tx, rx) = crossbeam_channel::bounded(workers);

    std::thread::scope(|s| {
        for (worker, duration) in durations.iter().copied().enumerate() {
            let tx = tx.clone();
            s.spawn(move || {
                std::thread::sleep(duration);
                let arrival = Instant::now();
                barrier.wait();
                let resume = Instant::now();
                let _ = tx.send((worker, arrival, resume));
            });
        }
    });
    drop(tx);

    let now = Instant::now();
    let mut arrivals = vec![now; workers];
    let mut resumes = vec![now; workers];
    for (worker, arrival, resume) in rx.iter() {
        arrivals[worker] = arrival;
        resumes[worker] = resume;
    }
    Ok(RendezvousReport::new(arrivals, resumes))
}
