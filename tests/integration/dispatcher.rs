//! Worker pool contracts: ordering, failure policies, events, shutdown.

use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::bounded;
use koan::{
    Error, FailurePolicy, PoolEvent, TaskContext, TaskError, TaskId, TaskResult, WorkerPool,
};

use crate::fixtures::index_tasks;

/// Results come back one per task, in submission order, whatever the
/// worker interleaving was.
#[test]
fn dispatch_returns_results_in_submission_order() {
    let pool: WorkerPool<usize> = WorkerPool::new(4).unwrap();
    let results = pool.dispatch_all(index_tasks(200)).unwrap();

    assert_eq!(results.len(), 200);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(*result, Ok(i));
    }
}

/// Under best-effort, one failing task stays isolated to its own slot and
/// every sibling still runs.
#[test]
fn best_effort_isolates_a_failure() {
    let pool: WorkerPool<usize> = WorkerPool::new(4).unwrap();
    let tasks: Vec<_> = (0..20)
        .map(|i| {
            move |_ctx: &TaskContext| -> TaskResult<usize> {
                if i == 7 {
                    Err(TaskError::Failed("slot seven".to_string()))
                } else {
                    Ok(i)
                }
            }
        })
        .collect();

    let results = pool.dispatch_all(tasks).unwrap();
    for (i, result) in results.iter().enumerate() {
        if i == 7 {
            assert_eq!(*result, Err(TaskError::Failed("slot seven".to_string())));
        } else {
            assert_eq!(*result, Ok(i));
        }
    }
}

/// Under fail-fast with a single worker the order of execution is the
/// queue order, so everything after the failing task resolves cancelled.
#[test]
fn fail_fast_cancels_queued_siblings() {
    let pool: WorkerPool<usize> = WorkerPool::new(1)
        .unwrap()
        .with_policy(FailurePolicy::FailFast);
    let tasks: Vec<_> = (0..6)
        .map(|i| {
            move |_ctx: &TaskContext| -> TaskResult<usize> {
                if i == 2 {
                    Err(TaskError::Failed("boom".to_string()))
                } else {
                    Ok(i)
                }
            }
        })
        .collect();

    let results = pool.dispatch_all(tasks).unwrap();
    assert_eq!(results[0], Ok(0));
    assert_eq!(results[1], Ok(1));
    assert_eq!(results[2], Err(TaskError::Failed("boom".to_string())));
    for result in &results[3..] {
        assert_eq!(*result, Err(TaskError::Cancelled));
    }
}

/// In-flight tasks observe fail-fast cancellation at their next
/// checkpoint rather than running to completion.
#[test]
fn fail_fast_reaches_in_flight_checkpoints() {
    let pool: WorkerPool<usize> = WorkerPool::new(2)
        .unwrap()
        .with_policy(FailurePolicy::FailFast);
    let (entered_tx, entered_rx) = bounded::<()>(1);

    let slow = move |ctx: &TaskContext| -> TaskResult<usize> {
        let _ = entered_tx.send(());
        // Cooperative loop: keep checking until cancellation lands.
        for _ in 0..2000 {
            if ctx.checkpoint().is_err() {
                return Err(TaskError::Cancelled);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(99)
    };
    let failing = move |_ctx: &TaskContext| -> TaskResult<usize> {
        // Let the slow task start before failing the dispatch.
        let _ = entered_rx.recv();
        Err(TaskError::Failed("trip".to_string()))
    };

    let results = pool
        .dispatch_all(vec![
            Box::new(slow) as Box<dyn FnOnce(&TaskContext) -> TaskResult<usize> + Send>,
            Box::new(failing),
        ])
        .unwrap();

    assert_eq!(results[0], Err(TaskError::Cancelled));
    assert_eq!(results[1], Err(TaskError::Failed("trip".to_string())));
}

/// Every task gets a Started event before its terminal event, and
/// terminal events match the outcomes.
#[test]
fn events_follow_task_lifecycle() {
    let (event_tx, event_rx) = bounded(256);
    let mut pool: WorkerPool<usize> = WorkerPool::with_events(2, event_tx).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            pool.submit(move |_ctx| {
                if i % 4 == 3 {
                    Err(TaskError::Failed("every fourth".to_string()))
                } else {
                    Ok(i)
                }
            })
            .unwrap()
        })
        .collect();
    for handle in handles {
        let _ = handle.join();
    }
    pool.shutdown().unwrap();

    let mut started: HashMap<TaskId, usize> = HashMap::new();
    let mut terminal: HashMap<TaskId, bool> = HashMap::new();
    let mut exited = 0;
    for event in event_rx.try_iter() {
        match event {
            PoolEvent::TaskStarted { task_id, .. } => {
                assert!(
                    !terminal.contains_key(&task_id),
                    "started after terminal event"
                );
                *started.entry(task_id).or_default() += 1;
            }
            PoolEvent::TaskCompleted { task_id, .. } => {
                assert!(started.contains_key(&task_id));
                assert!(terminal.insert(task_id, true).is_none());
            }
            PoolEvent::TaskFailed { task_id, error, .. } => {
                assert!(started.contains_key(&task_id));
                assert!(terminal.insert(task_id, false).is_none());
                assert!(error.contains("every fourth"));
            }
            PoolEvent::WorkerExited { .. } => exited += 1,
        }
    }

    assert_eq!(started.len(), 8);
    assert!(started.values().all(|&n| n == 1), "task started twice");
    assert_eq!(terminal.len(), 8);
    assert_eq!(terminal.values().filter(|&&ok| !ok).count(), 2);
    assert_eq!(exited, 2);
}

/// A pool can serve many dispatches before shutdown; submit-after-shutdown
/// is a hard error, and shutdown is idempotent.
#[test]
fn pool_lifecycle_construct_once_submit_many_shutdown_once() {
    let mut pool: WorkerPool<usize> = WorkerPool::new(4).unwrap();

    for round in 0..3 {
        let results = pool.dispatch_all(index_tasks(50)).unwrap();
        assert_eq!(results.len(), 50, "round {}", round);
    }

    pool.shutdown().unwrap();
    pool.shutdown().unwrap();
    assert!(matches!(
        pool.submit(|_ctx| Ok(0)),
        Err(Error::PoolShutdown)
    ));
    assert!(matches!(
        pool.dispatch_all(index_tasks(1)),
        Err(Error::PoolShutdown)
    ));
}

/// Cancelling the pool is never silent: queued tasks resolve with a
/// distinct cancelled error on their handles.
#[test]
fn cancelled_waits_surface_a_distinct_error() {
    let pool: WorkerPool<usize> = WorkerPool::new(1).unwrap();
    let (entered_tx, entered_rx) = bounded::<()>(1);
    let (hold_tx, hold_rx) = bounded::<()>(1);

    let blocker = pool
        .submit(move |_ctx| {
            let _ = entered_tx.send(());
            let _ = hold_rx.recv();
            Ok(0)
        })
        .unwrap();
    let queued: Vec<_> = (0..4)
        .map(|i| pool.submit(move |_ctx| Ok(i)).unwrap())
        .collect();

    // Only cancel once the blocker is confirmed running.
    entered_rx.recv().unwrap();
    pool.cancel();
    let _ = hold_tx.send(());

    assert_eq!(blocker.join(), Ok(0));
    for handle in queued {
        assert_eq!(handle.join(), Err(TaskError::Cancelled));
    }
}

/// A panicking task is surfaced on its own handle; the worker thread
/// survives and keeps serving tasks.
#[test]
fn panic_is_contained_to_the_task() {
    let pool: WorkerPool<usize> = WorkerPool::new(1).unwrap();

    let bad = pool
        .submit(|_ctx| -> TaskResult<usize> { panic!("contained") })
        .unwrap();
    let good = pool.submit(|_ctx| Ok(5)).unwrap();

    assert_eq!(bad.join(), Err(TaskError::Panicked("contained".to_string())));
    assert_eq!(good.join(), Ok(5));
}
