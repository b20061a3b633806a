//! Worker pool dispatch strategies.
//!
//! Three ways to spread a batch of tasks over a fixed set of workers:
//!
//! - [`dispatcher`]: dynamic pull from one shared queue (the reusable pool)
//! - [`partition`]: static contiguous chunking
//! - [`stealing`]: per-worker queues with round-robin theft

pub mod dispatcher;
pub mod partition;
pub mod stealing;

pub use dispatcher::{PoolEvent, WorkerPool};
pub use stealing::StealReport;
