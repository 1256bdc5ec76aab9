//! Task execution for the concurrent crawler roles
//!
//! This module handles:
//! - Running URL batches on scoped threads ([`SimpleExecutor`])
//! - A long-lived fixed-size worker pool ([`WorkerPool`])
//! - Admission control for the persistence stage ([`ConcurrencyGuard`])
//! - Splitting URL lists into per-worker chunks
//!
//! Every unit of work reports a [`TaskOutcome`]: a failing unit carries its
//! error and does not abort its siblings.

mod guard;
mod pool;
mod simple;

pub use guard::ConcurrencyGuard;
pub use pool::{ErrorCallback, SuccessCallback, WorkerPool};
pub use simple::SimpleExecutor;

use crate::Result;

/// Result of one unit of work
#[derive(Debug)]
pub struct TaskOutcome<T> {
    /// Position of the unit in submission order
    pub task_id: usize,
    /// URLs the unit was given
    pub urls: Vec<String>,
    pub result: Result<T>,
}

impl<T> TaskOutcome<T> {
    pub fn new(task_id: usize, urls: Vec<String>, result: Result<T>) -> Self {
        Self {
            task_id,
            urls,
            result,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Splits `urls` into at most `workers` contiguous chunks
///
/// Chunks hold `ceil(len / workers)` URLs each, the last one possibly
/// fewer. Every URL lands in exactly one chunk, in order.
///
/// # Example
///
/// ```
/// use sumi_crawler::executor::divide_urls;
///
/// let urls: Vec<String> = (1..=7).map(|i| i.to_string()).collect();
/// let chunks = divide_urls(&urls, 3);
///
/// assert_eq!(chunks.len(), 3);
/// assert_eq!(chunks[2], vec!["7".to_string()]);
/// ```
pub fn divide_urls(urls: &[String], workers: usize) -> Vec<Vec<String>> {
    if urls.is_empty() {
        return Vec::new();
    }

    let size = urls.len().div_ceil(workers.max(1));
    urls.chunks(size).map(<[String]>::to_vec).collect()
}

/// Reassembles per-task results in task order
///
/// Fails with the error of the first failed task.
pub fn flatten_outcomes<T>(mut outcomes: Vec<TaskOutcome<Vec<T>>>) -> Result<Vec<T>> {
    outcomes.sort_by_key(|outcome| outcome.task_id);

    let mut results = Vec::new();
    for outcome in outcomes {
        results.extend(outcome.result?);
    }
    Ok(results)
}

/// Collects single-value results in task order
pub fn collect_outcomes<T>(mut outcomes: Vec<TaskOutcome<T>>) -> Result<Vec<T>> {
    outcomes.sort_by_key(|outcome| outcome.task_id);
    outcomes.into_iter().map(|outcome| outcome.result).collect()
}
