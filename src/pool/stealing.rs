//! Work stealing: per-worker queues with round-robin theft.
//!
//! Each worker owns a deque and drains it from the front. Once its own
//! queue is empty it scans the other workers' queues in a fixed
//! round-robin order, starting just past its own index, and takes the
//! head of the first non-empty one it finds. A full scan that comes up
//! empty ends the worker; tasks never spawn more tasks here, so an empty
//! scan is a safe exit. The tie-break is illustrative, not a fairness
//! contract.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::task::panic_message;
use crate::{klog_debug, Error, Result};

/// Outcome of a stealing run: every task's result plus how many tasks
/// each worker ended up completing.
#[derive(Debug)]
pub struct StealReport<R> {
    /// Results in completion order (interleaving is scheduler-dependent).
    pub results: Vec<R>,
    /// Tasks completed per worker, indexed by worker.
    pub completed: Vec<usize>,
}

impl<R> StealReport<R> {
    /// Total tasks completed across all workers.
    pub fn total_completed(&self) -> usize {
        self.completed.iter().sum()
    }
}

/// How the initial work is laid out across the per-worker queues.
enum Seed {
    /// Tasks dealt round-robin across all queues.
    RoundRobin,
    /// Every task starts on worker 0's queue; the rest must steal.
    FirstWorker,
}

/// Run `tasks` across `workers` queues, seeding work round-robin.
pub fn run<R, F>(tasks: Vec<F>, workers: usize) -> Result<StealReport<R>>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    run_with_seed(tasks, workers, Seed::RoundRobin)
}

/// Run `tasks` with all initial work on worker 0.
///
/// The deliberately worst-case layout: workers 1..W start idle and can
/// make progress only by stealing.
pub fn run_seeded_first<R, F>(tasks: Vec<F>, workers: usize) -> Result<StealReport<R>>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    run_with_seed(tasks, workers, Seed::FirstWorker)
}

fn run_with_seed<R, F>(tasks: Vec<F>, workers: usize, seed: Seed) -> Result<StealReport<R>>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    if workers == 0 {
        return Err(Error::InvalidWorkerCount);
    }

    let total = tasks.len();
    let mut queues: Vec<Mutex<VecDeque<F>>> = (0..workers)
        .map(|_| Mutex::new(VecDeque::new()))
        .collect();
    for (i, task) in tasks.into_iter().enumerate() {
        let target = match seed {
            Seed::RoundRobin => i % workers,
            Seed::FirstWorker => 0,
        };
        lock_queue(&mut queues[target]).push_back(task);
    }

    let queues = &queues;
    let mut results = Vec::with_capacity(total);
    let mut completed = vec![0; workers];
    std::thread::scope(|s| -> Result<()> {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                s.spawn(move || {
                    let mut done = Vec::new();
                    while let Some(task) = next_task(queues, worker) {
                        done.push(task());
                    }
                    klog_debug!("steal worker {} finished {} tasks", worker, done.len());
                    done
                })
            })
            .collect();
        for (worker, handle) in handles.into_iter().enumerate() {
            let done = handle
                .join()
                .map_err(|payload| Error::WorkerPanic(panic_message(payload)))?;
            completed[worker] = done.len();
            results.extend(done);
        }
        Ok(())
    })?;

    Ok(StealReport { results, completed })
}

/// Take the next task: own queue first, then a round-robin scan of the
/// other queues starting just past `worker`.
fn next_task<F>(queues: &[Mutex<VecDeque<F>>], worker: usize) -> Option<F> {
    let workers = queues.len();
    for offset in 0..workers {
        let victim = (worker + offset) % workers;
        if let Some(task) = lock_slot(&queues[victim]).pop_front() {
            return Some(task);
        }
    }
    None
}

fn lock_queue<F>(queue: &mut Mutex<VecDeque<F>>) -> &mut VecDeque<F> {
    // Seeding happens before any worker exists, so no contention; poison
    // cannot occur yet either.
    queue.get_mut().unwrap_or_else(|e| e.into_inner())
}

fn lock_slot<F>(queue: &Mutex<VecDeque<F>>) -> MutexGuard<'_, VecDeque<F>> {
    queue.lock().unwrap_or_else(|e| e.into_inner())
}
