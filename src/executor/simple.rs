//! Scoped-thread executor

use super::TaskOutcome;
use crate::{ConfigError, CrawlError, Result};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread;

/// Runs URL batches on up to `workers` scoped threads
///
/// Threads borrow the task closure, so no `'static` bound is needed and
/// every thread is joined before a call returns.
#[derive(Debug, Clone, Copy)]
pub struct SimpleExecutor {
    workers: usize,
}

impl SimpleExecutor {
    /// # Errors
    ///
    /// Returns a validation error when `workers` is 0.
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(ConfigError::Validation("worker count must be at least 1".to_string()).into());
        }
        Ok(Self { workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `task` once per batch, one thread per batch
    ///
    /// At most `workers` batches run at the same time; any extra batches
    /// wait for the next wave. Outcomes come back in batch order.
    pub fn run<T, F>(&self, batches: Vec<Vec<String>>, task: F) -> Vec<TaskOutcome<T>>
    where
        T: Send,
        F: Fn(&[String]) -> Result<T> + Sync,
    {
        let mut outcomes = Vec::with_capacity(batches.len());
        let mut pending = batches.into_iter().enumerate().peekable();

        while pending.peek().is_some() {
            let wave: Vec<(usize, Vec<String>)> = pending.by_ref().take(self.workers).collect();
            let task = &task;

            thread::scope(|scope| {
                let handles: Vec<_> = wave
                    .into_iter()
                    .map(|(task_id, urls)| {
                        let handle = scope.spawn(move || {
                            tracing::debug!("Worker {} starting with {} URLs", task_id, urls.len());
                            let result = task(&urls);
                            (urls, result)
                        });
                        (task_id, handle)
                    })
                    .collect();

                for (task_id, handle) in handles {
                    outcomes.push(match handle.join() {
                        Ok((urls, result)) => TaskOutcome::new(task_id, urls, result),
                        Err(_) => {
                            tracing::error!("Worker {} panicked", task_id);
                            TaskOutcome::new(
                                task_id,
                                Vec::new(),
                                Err(CrawlError::WorkerPanicked { task_id }),
                            )
                        }
                    });
                }
            });
        }

        outcomes
    }

    /// Runs `task` once per URL
    pub fn map<T, F>(&self, urls: Vec<String>, task: F) -> Vec<TaskOutcome<T>>
    where
        T: Send,
        F: Fn(&str) -> Result<T> + Sync,
    {
        let batches = urls.into_iter().map(|url| vec![url]).collect();
        self.run(batches, |urls: &[String]| task(&urls[0]))
    }

    /// Runs `workers` threads that pull URLs from a shared queue until it is empty
    ///
    /// Each URL yields one outcome whose `task_id` is its queue position,
    /// and the outcomes come back sorted by it.
    pub fn run_queue<T, F>(&self, urls: Vec<String>, task: F) -> Vec<TaskOutcome<T>>
    where
        T: Send,
        F: Fn(&str) -> Result<T> + Sync,
    {
        let queue: Mutex<VecDeque<(usize, String)>> =
            Mutex::new(urls.into_iter().enumerate().collect());
        let collected: Mutex<Vec<TaskOutcome<T>>> = Mutex::new(Vec::new());

        thread::scope(|scope| {
            for worker in 0..self.workers {
                let (queue, collected, task) = (&queue, &collected, &task);
                scope.spawn(move || loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .pop_front();
                    let Some((task_id, url)) = next else {
                        tracing::debug!("Worker {} found the queue empty", worker);
                        break;
                    };

                    let result = panic::catch_unwind(AssertUnwindSafe(|| task(&url)))
                        .unwrap_or_else(|_| {
                            tracing::error!("Worker {} panicked on {}", worker, url);
                            Err(CrawlError::WorkerPanicked { task_id })
                        });
                    collected
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .push(TaskOutcome::new(task_id, vec![url], result));
                });
            }
        });

        let mut outcomes = collected
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        outcomes.sort_by_key(|outcome| outcome.task_id);
        outcomes
    }
}
