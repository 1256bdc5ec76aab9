//! Fixed-size worker pool
//!
//! Workers are long-lived threads fed through a shared job channel. Jobs
//! can be submitted in blocking style (`apply`, `map`: wait for the
//! outcomes) or fire-and-forget style (`async_apply`, `async_map`: run
//! callbacks on the worker, outcomes collected later with `get_result`).

use super::TaskOutcome;
use crate::{ConfigError, CrawlError, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Called on the worker with each successful result
pub type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Called on the worker with each error
pub type ErrorCallback = Arc<dyn Fn(&CrawlError) + Send + Sync>;

/// Outcomes of fire-and-forget jobs plus a count of jobs still running
struct Collected<T> {
    outcomes: Mutex<Vec<TaskOutcome<T>>>,
    pending: Mutex<usize>,
    idle: Condvar,
}

impl<T> Collected<T> {
    fn new() -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
            pending: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    fn begin(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending += 1;
        }
    }

    fn finish(&self, outcome: TaskOutcome<T>) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push(outcome);
        }
        if let Ok(mut pending) = self.pending.lock() {
            *pending = pending.saturating_sub(1);
            if *pending == 0 {
                self.idle.notify_all();
            }
        }
    }

    /// Forgets a job that was counted but never submitted
    fn abandon(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = pending.saturating_sub(1);
            if *pending == 0 {
                self.idle.notify_all();
            }
        }
    }

    fn wait_idle(&self) {
        let Ok(mut pending) = self.pending.lock() else {
            return;
        };
        while *pending > 0 {
            pending = match self.idle.wait(pending) {
                Ok(guard) => guard,
                Err(_) => return,
            };
        }
    }

    fn drain(&self) -> Vec<TaskOutcome<T>> {
        let mut outcomes = match self.outcomes.lock() {
            Ok(mut outcomes) => std::mem::take(&mut *outcomes),
            Err(_) => Vec::new(),
        };
        outcomes.sort_by_key(|outcome| outcome.task_id);
        outcomes
    }
}

/// A pool of `size` worker threads producing `T` results
pub struct WorkerPool<T> {
    size: usize,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    cancelled: Arc<AtomicBool>,
    next_task_id: AtomicUsize,
    collected: Arc<Collected<T>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Starts `size` workers
    ///
    /// # Errors
    ///
    /// Returns a validation error when `size` is 0.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(ConfigError::Validation("pool size must be at least 1".to_string()).into());
        }

        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("crawl-worker-{}", id))
                    .spawn(move || worker_loop(id, receiver))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        tracing::debug!("Started worker pool with {} workers", size);

        Ok(Self {
            size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            cancelled: Arc::new(AtomicBool::new(false)),
            next_task_id: AtomicUsize::new(0),
            collected: Arc::new(Collected::new()),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the pool still accepts jobs
    pub fn is_running(&self) -> bool {
        self.sender
            .lock()
            .map(|sender| sender.is_some())
            .unwrap_or(false)
    }

    fn submit(&self, job: Job) -> Result<()> {
        let sender = self.sender.lock().map_err(|_| CrawlError::PoolClosed)?;
        match sender.as_ref() {
            Some(sender) => sender.send(job).map_err(|_| CrawlError::PoolClosed),
            None => Err(CrawlError::PoolClosed),
        }
    }

    /// Wraps `task` so that it honors termination and reports its outcome
    fn job<F, D>(&self, task_id: usize, urls: Vec<String>, task: F, deliver: D) -> Job
    where
        F: FnOnce(&[String]) -> Result<T> + Send + 'static,
        D: FnOnce(TaskOutcome<T>) + Send + 'static,
    {
        let cancelled = Arc::clone(&self.cancelled);
        Box::new(move || {
            let result = if cancelled.load(Ordering::SeqCst) {
                Err(CrawlError::PoolClosed)
            } else {
                panic::catch_unwind(AssertUnwindSafe(|| task(&urls)))
                    .unwrap_or_else(|_| Err(CrawlError::WorkerPanicked { task_id }))
            };
            deliver(TaskOutcome::new(task_id, urls, result));
        })
    }

    fn next_id(&self) -> usize {
        self.next_task_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Runs one task per batch and waits for all of them
    ///
    /// Outcomes come back in batch order.
    pub fn apply<F>(&self, batches: Vec<Vec<String>>, task: F) -> Result<Vec<TaskOutcome<T>>>
    where
        F: Fn(&[String]) -> Result<T> + Send + Sync + 'static,
    {
        let task = Arc::new(task);
        let (tx, rx) = mpsc::channel();
        let count = batches.len();

        for (index, urls) in batches.into_iter().enumerate() {
            let task = Arc::clone(&task);
            let tx = tx.clone();
            let job = self.job(
                index,
                urls,
                move |urls: &[String]| task(urls),
                move |outcome| {
                    let _ = tx.send(outcome);
                },
            );
            self.submit(job)?;
        }
        drop(tx);

        let mut outcomes: Vec<TaskOutcome<T>> = rx.iter().take(count).collect();
        if outcomes.len() < count {
            return Err(CrawlError::PoolClosed);
        }
        outcomes.sort_by_key(|outcome| outcome.task_id);
        Ok(outcomes)
    }

    /// Runs `task` once per URL and waits for all of them
    pub fn map<F>(&self, urls: Vec<String>, task: F) -> Result<Vec<TaskOutcome<T>>>
    where
        F: Fn(&str) -> Result<T> + Send + Sync + 'static,
    {
        let batches = urls.into_iter().map(|url| vec![url]).collect();
        self.apply(batches, move |urls: &[String]| task(&urls[0]))
    }

    /// Submits one task per batch without waiting
    ///
    /// Callbacks run on the worker thread. Collect the outcomes with
    /// [`get_result`](Self::get_result).
    pub fn async_apply<F>(
        &self,
        batches: Vec<Vec<String>>,
        task: F,
        on_success: Option<SuccessCallback<T>>,
        on_error: Option<ErrorCallback>,
    ) -> Result<()>
    where
        F: Fn(&[String]) -> Result<T> + Send + Sync + 'static,
    {
        let task = Arc::new(task);

        for urls in batches {
            let task = Arc::clone(&task);
            let collected = Arc::clone(&self.collected);
            let on_success = on_success.clone();
            let on_error = on_error.clone();

            self.collected.begin();
            let job = self.job(
                self.next_id(),
                urls,
                move |urls: &[String]| task(urls),
                move |outcome| {
                    match (&outcome.result, &on_success, &on_error) {
                        (Ok(value), Some(callback), _) => callback(value),
                        (Err(error), _, Some(callback)) => callback(error),
                        _ => {}
                    }
                    collected.finish(outcome);
                },
            );

            if let Err(e) = self.submit(job) {
                self.collected.abandon();
                return Err(e);
            }
        }

        Ok(())
    }

    /// Submits one task per URL without waiting
    pub fn async_map<F>(
        &self,
        urls: Vec<String>,
        task: F,
        on_success: Option<SuccessCallback<T>>,
        on_error: Option<ErrorCallback>,
    ) -> Result<()>
    where
        F: Fn(&str) -> Result<T> + Send + Sync + 'static,
    {
        let batches = urls.into_iter().map(|url| vec![url]).collect();
        self.async_apply(
            batches,
            move |urls: &[String]| task(&urls[0]),
            on_success,
            on_error,
        )
    }

    /// Waits for every fire-and-forget job and returns their outcomes
    ///
    /// Outcomes are ordered by submission and removed from the pool.
    pub fn get_result(&self) -> Vec<TaskOutcome<T>> {
        self.collected.wait_idle();
        self.collected.drain()
    }

    /// Stops accepting jobs, lets queued jobs finish and joins the workers
    pub fn close(&self) {
        self.shutdown();
    }

    /// Stops accepting jobs and skips the ones not yet started
    ///
    /// Skipped jobs report [`CrawlError::PoolClosed`].
    pub fn terminate(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.shutdown();
    }

    fn shutdown(&self) {
        let sender = self.sender.lock().ok().and_then(|mut sender| sender.take());
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => Vec::new(),
        };
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("A pool worker panicked during shutdown");
            }
        }
        tracing::debug!("Worker pool closed");
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        if let Ok(sender) = self.sender.get_mut() {
            sender.take();
        }
        if let Ok(workers) = self.workers.get_mut() {
            for worker in workers.drain(..) {
                let _ = worker.join();
            }
        }
    }
}

fn worker_loop(id: usize, receiver: Arc<Mutex<Receiver<Job>>>) {
    loop {
        let job = match receiver.lock() {
            Ok(receiver) => receiver.recv(),
            Err(_) => break,
        };

        match job {
            Ok(job) => {
                // A panicking callback must not take the worker down with it
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!("Job on worker {} panicked", id);
                }
            }
            Err(_) => break,
        }
    }
    tracing::trace!("Worker {} exiting", id);
}
