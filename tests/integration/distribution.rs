//! Static partitioning and work stealing lose no work.

use std::collections::HashSet;

use koan::pool::{partition, stealing};

const TASKS: usize = 1000;

/// Partitioning T tasks across W workers processes every task exactly
/// once; the union of per-chunk results equals the full input for every
/// worker count.
#[test]
fn partition_processes_every_task_exactly_once() {
    let input: Vec<usize> = (0..TASKS).collect();
    for workers in [1, 2, 4, 8] {
        let results = partition::dispatch_chunked(&input, workers, |i| *i).unwrap();
        assert_eq!(results.len(), TASKS, "workers={}", workers);

        let unique: HashSet<usize> = results.iter().copied().collect();
        assert_eq!(unique.len(), TASKS, "duplicates with workers={}", workers);
        assert_eq!(
            unique,
            input.iter().copied().collect::<HashSet<_>>(),
            "dropped tasks with workers={}",
            workers
        );
    }
}

/// The raw ranges behind the dispatch cover the index space exactly.
#[test]
fn partition_ranges_cover_index_space() {
    for workers in [1, 2, 4, 8] {
        let ranges = partition::partition(TASKS, workers).unwrap();
        let mut covered: Vec<usize> = ranges.into_iter().flatten().collect();
        covered.sort_unstable();
        assert_eq!(covered, (0..TASKS).collect::<Vec<_>>());
    }
}

/// With every task seeded on worker 0 and the rest idle, stealing still
/// completes the full count: per-worker totals sum to the task count and
/// no task is dropped or double-counted.
#[test]
fn stealing_from_one_seeded_worker_completes_everything() {
    for workers in [1, 2, 4, 8] {
        let tasks: Vec<_> = (0..TASKS).map(|i| move || i).collect();
        let report = stealing::run_seeded_first(tasks, workers).unwrap();

        assert_eq!(report.completed.len(), workers);
        assert_eq!(report.total_completed(), TASKS, "workers={}", workers);

        let unique: HashSet<usize> = report.results.iter().copied().collect();
        assert_eq!(unique.len(), TASKS, "double-counted with workers={}", workers);
        assert_eq!(
            unique,
            (0..TASKS).collect::<HashSet<_>>(),
            "dropped with workers={}",
            workers
        );
    }
}

/// Stealing actually spreads slow work: with blocking tasks and several
/// workers, worker 0 cannot have done all of them alone.
#[test]
fn stealing_balances_slow_tasks() {
    let tasks: Vec<_> = (0..64)
        .map(|i| {
            move || {
                std::thread::sleep(std::time::Duration::from_millis(2));
                i
            }
        })
        .collect();
    let report = stealing::run_seeded_first(tasks, 4).unwrap();

    assert_eq!(report.total_completed(), 64);
    let thieves: usize = report.completed[1..].iter().sum();
    assert!(
        thieves > 0,
        "idle workers never stole: {:?}",
        report.completed
    );
}
