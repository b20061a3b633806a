//! Task data model for the dispatcher.
//!
//! A task is a zero-argument unit of work submitted to a pool. It exists
//! only for the duration of one dispatch, is owned by the dispatcher until
//! completion, and runs at most once. Its outcome is observed exactly once
//! through a [`TaskHandle`].

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique identifier for a task within a dispatch.
///
/// Uses UUID v4 for generation and provides a short form display
/// for human-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Create a new unique task identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Task status in its lifecycle.
///
/// Transitions are driven solely by worker execution: Pending when queued,
/// Running once a worker picks the task up, then Completed or Failed.
/// There are no retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum TaskStatus {
    /// Task queued but not yet picked up by a worker.
    Pending,
    /// Task is currently executing on a worker.
    Running,
    /// Task completed successfully.
    Completed,
    /// Task failed with an error.
    Failed {
        /// Error message describing the failure.
        error: String,
    },
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

/// Why a single task did not produce a value.
///
/// A task error is isolated to its own handle; it does not cancel sibling
/// tasks unless the pool's failure policy says so.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(String),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task cancelled before completion")]
    Cancelled,
}

/// Outcome of a single task.
pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// Boxed task closure as stored on the queue.
pub type TaskFn<T> = Box<dyn FnOnce(&TaskContext) -> TaskResult<T> + Send + 'static>;

/// Execution context passed by reference to every task closure.
///
/// Carries the cancellation token and the index of the executing worker.
/// Tasks that loop or block should call [`TaskContext::checkpoint`] at safe
/// points; cancellation is cooperative, never preemptive.
#[derive(Debug, Clone)]
pub struct TaskContext {
    token: CancellationToken,
    worker: usize,
}

impl TaskContext {
    pub(crate) fn new(token: CancellationToken, worker: usize) -> Self {
        Self { token, worker }
    }

    /// Index of the worker running this task.
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Whether the dispatch this task belongs to has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cooperative safe point: return early with `TaskError::Cancelled`
    /// when the dispatch has been cancelled.
    pub fn checkpoint(&self) -> TaskResult<()> {
        if self.token.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A handle representing a task's eventual outcome.
///
/// Created when the task is submitted, resolved when the task completes,
/// and consumed exactly once by the caller via [`TaskHandle::join`].
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    rx: Receiver<TaskResult<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(id: TaskId, rx: Receiver<TaskResult<T>>) -> Self {
        Self { id, rx }
    }

    /// The identifier of the task this handle belongs to.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Block until the task resolves and consume the handle.
    ///
    /// A task that was discarded without running (pool torn down before it
    /// was picked up) resolves as `TaskError::Cancelled` rather than
    /// blocking forever or silently vanishing.
    pub fn join(self) -> TaskResult<T> {
        self.rx.recv().unwrap_or(Err(TaskError::Cancelled))
    }

    /// Non-blocking probe; returns the outcome if the task has resolved.
    pub fn try_join(self) -> std::result::Result<TaskResult<T>, Self> {
        match self.rx.try_recv() {
            Ok(outcome) => Ok(outcome),
            Err(crossbeam_channel::TryRecvError::Empty) => Err(self),
            Err(crossbeam_channel::TryRecvError::Disconnected) => Ok(Err(TaskError::Cancelled)),
        }
    }
}

/// Render a panic payload as a message for `TaskError::Panicked`.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
