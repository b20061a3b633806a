pub mod config;
pub mod error;
pub mod log;
pub mod pool;
pub mod sync;
pub mod task;

pub use config::{Config, FailurePolicy};
pub use error::{Error, Result};
pub use pool::{PoolEvent, StealReport, WorkerPool};
pub use task::{TaskContext, TaskError, TaskHandle, TaskId, TaskResult, TaskStatus};
