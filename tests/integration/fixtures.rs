//! Shared helpers for the integration suite.

use koan::{TaskContext, TaskResult};

/// Standard experiment size used across the suite: 10 workers, 1000
/// increments each, so a correct counter always reads 10_000.
pub const WORKERS: usize = 10;
pub const INCREMENTS: usize = 1000;

pub fn expected_count() -> u64 {
    (WORKERS * INCREMENTS) as u64
}

/// A batch of tasks that each resolve to their own index.
pub fn index_tasks(count: usize) -> Vec<impl FnOnce(&TaskContext) -> TaskResult<usize> + Send> {
    (0..count).map(|i| move |_ctx: &TaskContext| Ok(i)).collect()
}
