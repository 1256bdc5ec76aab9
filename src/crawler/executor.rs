//! Thread-backed crawler role

use super::factory::CrawlerFactory;
use super::simple::SimpleCrawler;
use crate::components::{DataHandler, HttpMethod, ResponseParser, Transport};
use crate::executor::{divide_urls, ConcurrencyGuard, SimpleExecutor, TaskOutcome};
use crate::Result;

/// Spreads URLs over a fixed number of worker threads
///
/// With more URLs than workers the list is cut into one contiguous chunk
/// per worker. Otherwise each URL gets its own worker, and idle workers
/// are reported. Either way every worker runs the sequential pipeline on
/// its share, and outcomes come back in input order.
pub struct ExecutorCrawler<T, P, H: DataHandler> {
    crawler: SimpleCrawler<T, P, H>,
    executor: SimpleExecutor,
    guard: ConcurrencyGuard,
}

impl<T, P, H> ExecutorCrawler<T, P, H>
where
    T: Transport,
    P: ResponseParser<Response = T::Response>,
    H: DataHandler<Input = P::Output>,
    H::Output: Send,
{
    /// # Errors
    ///
    /// Returns a validation error when `workers` is 0.
    pub fn new(factory: CrawlerFactory<T, P, H>, workers: usize) -> Result<Self> {
        Ok(Self {
            crawler: SimpleCrawler::new(factory),
            executor: SimpleExecutor::new(workers)?,
            guard: ConcurrencyGuard::lock(),
        })
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.crawler = self.crawler.with_retry(retry);
        self
    }

    /// Replaces the default lock around the persistence stage
    pub fn with_guard(mut self, guard: ConcurrencyGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn workers(&self) -> usize {
        self.executor.workers()
    }

    /// The pipeline each worker runs
    pub fn crawler(&self) -> &SimpleCrawler<T, P, H> {
        &self.crawler
    }

    fn batches(&self, urls: &[String]) -> Vec<Vec<String>> {
        let workers = self.workers();
        if urls.len() <= workers {
            if urls.len() < workers {
                tracing::warn!(
                    "{} URLs for {} workers, {} workers will stay idle",
                    urls.len(),
                    workers,
                    workers - urls.len()
                );
            }
            urls.iter().map(|url| vec![url.clone()]).collect()
        } else {
            divide_urls(urls, workers)
        }
    }

    /// Crawls `urls` across the workers
    ///
    /// Each outcome holds the results of one worker's share. A failing URL
    /// fails its own share only.
    pub fn run(&self, method: &str, urls: &[String]) -> Result<Vec<TaskOutcome<Vec<H::Output>>>> {
        let method = HttpMethod::dispatch(method)?;
        let batches = self.batches(urls);
        tracing::info!(
            "Crawling {} URLs in {} tasks on {} workers",
            urls.len(),
            batches.len(),
            self.workers()
        );

        Ok(self
            .executor
            .run(batches, |share: &[String]| self.crawler.process_urls(method, share)))
    }

    /// Crawls `urls` with workers pulling from one shared queue
    ///
    /// Each URL yields its own outcome.
    pub fn run_queue(&self, method: &str, urls: &[String]) -> Result<Vec<TaskOutcome<H::Output>>> {
        let method = HttpMethod::dispatch(method)?;
        Ok(self
            .executor
            .run_queue(urls.to_vec(), |url: &str| self.crawler.process_url(method, url)))
    }

    /// Like [`run`](Self::run), but each worker persists its own share
    ///
    /// A share is saved only when all of its URLs succeed. Saves wait for
    /// the guard. Successful outcomes carry the number of saved results.
    pub fn run_and_save(&self, method: &str, urls: &[String]) -> Result<Vec<TaskOutcome<usize>>> {
        let method = HttpMethod::dispatch(method)?;
        let batches = self.batches(urls);

        Ok(self.executor.run(batches, |share: &[String]| {
            let data = self.crawler.process_urls(method, share)?;
            let _permit = self.guard.acquire_blocking()?;
            self.crawler.persist(&data)?;
            Ok(data.len())
        }))
    }
}
