//! Fixed-size worker pool task dispatcher.
//!
//! The `WorkerPool` owns N OS threads pulling from a shared queue. Callers
//! submit zero-argument task closures and get back a [`TaskHandle`] per
//! task, or dispatch a whole batch and block until every outcome is in.
//! The pool emits events for task lifecycle changes via an optional
//! channel so external components can react without polling.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, FailurePolicy};
use crate::task::{
    panic_message, TaskContext, TaskError, TaskFn, TaskHandle, TaskId, TaskResult, TaskStatus,
};
use crate::{klog_debug, Error, Result};

/// Events emitted by the pool for task lifecycle changes.
///
/// Delivery is best-effort: a full event channel drops events rather than
/// ever blocking a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    /// A worker has started executing a task.
    TaskStarted {
        /// The task that started.
        task_id: TaskId,
        /// Index of the executing worker.
        worker: usize,
    },
    /// A task completed successfully.
    TaskCompleted {
        /// The task that completed.
        task_id: TaskId,
        /// Index of the executing worker.
        worker: usize,
    },
    /// A task failed, panicked, or was cancelled before running.
    TaskFailed {
        /// The task that failed.
        task_id: TaskId,
        /// Index of the executing worker.
        worker: usize,
        /// Error message describing the failure.
        error: String,
    },
    /// A worker thread has drained the queue and exited.
    WorkerExited {
        /// Index of the exiting worker.
        worker: usize,
    },
}

impl PoolEvent {
    /// The task status this event implies, if it concerns a task.
    ///
    /// Lets event consumers track each task through
    /// `Pending -> Running -> Completed | Failed` without polling the
    /// pool; a task with no events yet is `TaskStatus::Pending`.
    pub fn status(&self) -> Option<TaskStatus> {
        match self {
            PoolEvent::TaskStarted { .. } => Some(TaskStatus::Running),
            PoolEvent::TaskCompleted { .. } => Some(TaskStatus::Completed),
            PoolEvent::TaskFailed { error, .. } => Some(TaskStatus::Failed {
                error: error.clone(),
            }),
            PoolEvent::WorkerExited { .. } => None,
        }
    }
}

/// One queued unit of work: the closure, its identity, its result slot,
/// and the cancellation token scoping it.
struct Job<T> {
    id: TaskId,
    run: TaskFn<T>,
    result_tx: Sender<TaskResult<T>>,
    token: CancellationToken,
}

/// A fixed-size pool of worker threads pulling tasks from a shared queue.
///
/// Construct once, submit many, shut down once. Workers pull dynamically,
/// so an uneven mix of task durations still balances across threads.
///
/// # Example
///
/// ```
/// use koan::{TaskContext, WorkerPool};
///
/// let pool: WorkerPool<usize> = WorkerPool::new(4)?;
/// let results = pool.dispatch_all(
///     (0..8).map(|i| move |_ctx: &TaskContext| Ok(i * i)).collect(),
/// )?;
/// assert_eq!(results.len(), 8);
/// assert_eq!(results[3], Ok(9));
/// # Ok::<(), koan::Error>(())
/// ```
pub struct WorkerPool<T: Send + 'static> {
    /// Sending half of the shared queue; `None` once shut down.
    job_tx: Option<Sender<Job<T>>>,
    /// Handles for the worker threads, joined on shutdown.
    workers: Vec<JoinHandle<()>>,
    /// Root cancellation token; dispatches run under child tokens.
    token: CancellationToken,
    /// What a failed task does to its in-flight siblings.
    policy: FailurePolicy,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Create a pool with the given number of worker threads.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidWorkerCount` for a zero worker count, or an
    /// IO error if a worker thread cannot be spawned.
    pub fn new(workers: usize) -> Result<Self> {
        Self::build(workers, FailurePolicy::BestEffort, None)
    }

    /// Create a pool that emits [`PoolEvent`]s on the given channel.
    pub fn with_events(workers: usize, events: Sender<PoolEvent>) -> Result<Self> {
        Self::build(workers, FailurePolicy::BestEffort, Some(events))
    }

    /// Create a pool from configuration (worker count and failure policy).
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(config.effective_workers(), config.failure_policy, None)
    }

    /// Create a pool from configuration together with an event channel
    /// sized by the config's event capacity; returns the receiving half.
    pub fn from_config_with_events(config: &Config) -> Result<(Self, Receiver<PoolEvent>)> {
        let (event_tx, event_rx) = bounded(config.effective_event_capacity());
        let pool = Self::build(
            config.effective_workers(),
            config.failure_policy,
            Some(event_tx),
        )?;
        Ok((pool, event_rx))
    }

    /// Replace the failure policy, consuming and returning the pool.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn build(
        workers: usize,
        policy: FailurePolicy,
        events: Option<Sender<PoolEvent>>,
    ) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidWorkerCount);
        }

        let (job_tx, job_rx) = unbounded::<Job<T>>();
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let rx = job_rx.clone();
            let events = events.clone();
            let handle = std::thread::Builder::new()
                .name(format!("koan-worker-{}", worker))
                .spawn(move || worker_loop(worker, rx, events))?;
            handles.push(handle);
        }
        klog_debug!("pool started with {} workers, policy={}", workers, policy);

        Ok(Self {
            job_tx: Some(job_tx),
            workers: handles,
            token: CancellationToken::new(),
            policy,
        })
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// The failure policy applied by [`WorkerPool::dispatch_all`].
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Whether `shutdown` has already run.
    pub fn is_shut_down(&self) -> bool {
        self.job_tx.is_none()
    }

    /// Cancel everything scoped to this pool.
    ///
    /// Queued tasks resolve as `TaskError::Cancelled`; running tasks
    /// observe the token at their next checkpoint. The pool itself stays
    /// up and rejects nothing; this only trips the token.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Submit a single task and receive a handle to its outcome.
    ///
    /// # Errors
    ///
    /// Returns `Error::PoolShutdown` once the pool has been shut down.
    pub fn submit<F>(&self, task: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce(&TaskContext) -> TaskResult<T> + Send + 'static,
    {
        self.submit_with_token(Box::new(task), self.token.child_token())
    }

    /// Run a batch of tasks and block until all outcomes are in.
    ///
    /// Results come back in submission order, one per task. Under
    /// `FailurePolicy::BestEffort` every task runs to completion and a
    /// failure stays isolated to its own slot. Under
    /// `FailurePolicy::FailFast` the first failure cancels the
    /// dispatch-scoped token: queued siblings resolve as cancelled and
    /// in-flight siblings observe the token at their next checkpoint.
    pub fn dispatch_all<F>(&self, tasks: Vec<F>) -> Result<Vec<TaskResult<T>>>
    where
        F: FnOnce(&TaskContext) -> TaskResult<T> + Send + 'static,
    {
        let scope = self.token.child_token();
        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            let run: TaskFn<T> = match self.policy {
                FailurePolicy::BestEffort => Box::new(task),
                FailurePolicy::FailFast => {
                    let guard = scope.clone();
                    Box::new(move |ctx: &TaskContext| {
                        let outcome = task(ctx);
                        if outcome.is_err() {
                            guard.cancel();
                        }
                        outcome
                    })
                }
            };
            handles.push(self.submit_with_token(run, scope.clone())?);
        }
        Ok(handles.into_iter().map(TaskHandle::join).collect())
    }

    fn submit_with_token(&self, run: TaskFn<T>, token: CancellationToken) -> Result<TaskHandle<T>> {
        let job_tx = self.job_tx.as_ref().ok_or(Error::PoolShutdown)?;
        let id = TaskId::new();
        let (result_tx, result_rx) = bounded(1);
        job_tx
            .send(Job {
                id,
                run,
                result_tx,
                token,
            })
            .map_err(|_| Error::PoolShutdown)?;
        klog_debug!("task {} queued", id.short());
        Ok(TaskHandle::new(id, result_rx))
    }

    /// Shut the pool down: cancel the token, close the queue, join workers.
    ///
    /// Tasks still queued resolve as `TaskError::Cancelled`. Idempotent;
    /// repeated calls return `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkerPanic` if a worker thread panicked outside a
    /// task (task panics are caught and surfaced on the task's handle).
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(job_tx) = self.job_tx.take() else {
            return Ok(());
        };
        klog_debug!("pool shutting down");
        self.token.cancel();
        drop(job_tx);

        for handle in self.workers.drain(..) {
            handle
                .join()
                .map_err(|payload| Error::WorkerPanic(panic_message(payload)))?;
        }
        Ok(())
    }
}

impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Pull jobs off the shared queue until it closes and drains.
fn worker_loop<T: Send + 'static>(
    worker: usize,
    jobs: Receiver<Job<T>>,
    events: Option<Sender<PoolEvent>>,
) {
    klog_debug!("worker {} started", worker);
    for job in jobs.iter() {
        if job.token.is_cancelled() {
            emit(
                &events,
                PoolEvent::TaskFailed {
                    task_id: job.id,
                    worker,
                    error: TaskError::Cancelled.to_string(),
                },
            );
            let _ = job.result_tx.send(Err(TaskError::Cancelled));
            continue;
        }

        emit(
            &events,
            PoolEvent::TaskStarted {
                task_id: job.id,
                worker,
            },
        );
        let ctx = TaskContext::new(job.token.clone(), worker);
        let run = job.run;
        let outcome = catch_unwind(AssertUnwindSafe(|| run(&ctx)))
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload))));

        match &outcome {
            Ok(_) => emit(
                &events,
                PoolEvent::TaskCompleted {
                    task_id: job.id,
                    worker,
                },
            ),
            Err(error) => emit(
                &events,
                PoolEvent::TaskFailed {
                    task_id: job.id,
                    worker,
                    error: error.to_string(),
                },
            ),
        }
        // The caller may have dropped the handle; that is not an error.
        let _ = job.result_tx.send(outcome);
    }
    klog_debug!("worker {} exiting", worker);
    emit(&events, PoolEvent::WorkerExited { worker });
}

fn emit(events: &Option<Sender<PoolEvent>>, event: PoolEvent) {
    if let Some(tx) = events {
        let _ = tx.try_send(event);
    }
}
