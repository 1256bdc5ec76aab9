//! Worker-pool crawler role

use super::factory::CrawlerFactory;
use super::simple::SimpleCrawler;
use super::CrawlOutput;
use crate::components::{DataHandler, HttpMethod, ResponseParser, Transport};
use crate::executor::{
    divide_urls, ConcurrencyGuard, ErrorCallback, SuccessCallback, TaskOutcome, WorkerPool,
};
use crate::{CrawlError, Result};
use std::sync::Arc;

/// Crawls on a long-lived pool of worker threads
///
/// The pool is started with [`init`](Self::init) and stopped with
/// [`close`](Self::close) or [`terminate`](Self::terminate); dropping the
/// crawler closes it too. `apply` hands out one contiguous chunk per
/// worker, `map` one URL per task. The `async_*` variants return
/// immediately and report through callbacks and
/// [`get_result`](Self::get_result).
pub struct PoolCrawler<T, P, H: DataHandler> {
    crawler: Arc<SimpleCrawler<T, P, H>>,
    workers: usize,
    pool: Option<WorkerPool<CrawlOutput<H::Output>>>,
    guard: Option<ConcurrencyGuard>,
}

impl<T, P, H> PoolCrawler<T, P, H>
where
    T: Transport + 'static,
    P: ResponseParser<Response = T::Response> + 'static,
    H: DataHandler<Input = P::Output> + 'static,
    H::Output: Send + 'static,
{
    pub fn new(factory: CrawlerFactory<T, P, H>, workers: usize) -> Self {
        Self::from_crawler(SimpleCrawler::new(factory), workers)
    }

    pub fn from_crawler(crawler: SimpleCrawler<T, P, H>, workers: usize) -> Self {
        Self {
            crawler: Arc::new(crawler),
            workers,
            pool: None,
            guard: None,
        }
    }

    /// Starts the workers and sets up the persistence guard
    ///
    /// # Errors
    ///
    /// Returns a validation error when the worker count is 0, or when
    /// `lock` is false and `sema_value` is 0. Nothing is started then.
    pub fn init(&mut self, lock: bool, sema_value: usize) -> Result<()> {
        let guard = ConcurrencyGuard::from_settings(lock, sema_value)?;
        if let Some(old) = self.pool.take() {
            old.close();
        }
        self.pool = Some(WorkerPool::new(self.workers)?);
        self.guard = Some(guard);
        tracing::info!("Pool crawler started with {} workers", self.workers);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.pool.as_ref().is_some_and(WorkerPool::is_running)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn pool(&self) -> Result<&WorkerPool<CrawlOutput<H::Output>>> {
        self.pool.as_ref().ok_or(CrawlError::PoolClosed)
    }

    /// The closure a worker runs for one share of URLs
    fn task(
        &self,
        method: HttpMethod,
        save: bool,
    ) -> Result<impl Fn(&[String]) -> Result<CrawlOutput<H::Output>> + Send + Sync + 'static> {
        let crawler = Arc::clone(&self.crawler);
        let guard = self.guard.clone().ok_or(CrawlError::PoolClosed)?;

        Ok(move |share: &[String]| -> Result<CrawlOutput<H::Output>> {
            let data = crawler.process_urls(method, share)?;
            if save {
                let _permit = guard.acquire_blocking()?;
                crawler.persist(&data)?;
            }
            Ok(CrawlOutput::Batch(data))
        })
    }

    fn single_task(
        &self,
        method: HttpMethod,
        save: bool,
    ) -> Result<impl Fn(&str) -> Result<CrawlOutput<H::Output>> + Send + Sync + 'static> {
        let task = self.task(method, save)?;
        Ok(move |url: &str| -> Result<CrawlOutput<H::Output>> {
            let share = [url.to_string()];
            let mut data = task(&share[..])?.into_vec();
            data.pop()
                .map(CrawlOutput::Single)
                .ok_or_else(|| CrawlError::Handler(format!("no result for {}", url)))
        })
    }

    // ===== Blocking Submission =====

    /// Crawls one contiguous chunk per worker and waits for all of them
    pub fn apply(
        &self,
        method: &str,
        urls: &[String],
    ) -> Result<Vec<TaskOutcome<CrawlOutput<H::Output>>>> {
        self.apply_with(method, urls, false)
    }

    /// [`apply`](Self::apply), with each chunk persisted by its worker
    pub fn apply_and_save(
        &self,
        method: &str,
        urls: &[String],
    ) -> Result<Vec<TaskOutcome<CrawlOutput<H::Output>>>> {
        self.apply_with(method, urls, true)
    }

    fn apply_with(
        &self,
        method: &str,
        urls: &[String],
        save: bool,
    ) -> Result<Vec<TaskOutcome<CrawlOutput<H::Output>>>> {
        let method = HttpMethod::dispatch(method)?;
        let pool = self.pool()?;
        pool.apply(divide_urls(urls, self.workers), self.task(method, save)?)
    }

    /// Crawls each URL as its own task and waits for all of them
    pub fn map(
        &self,
        method: &str,
        urls: &[String],
    ) -> Result<Vec<TaskOutcome<CrawlOutput<H::Output>>>> {
        self.map_with(method, urls, false)
    }

    /// [`map`](Self::map), with each URL's result persisted by its worker
    pub fn map_and_save(
        &self,
        method: &str,
        urls: &[String],
    ) -> Result<Vec<TaskOutcome<CrawlOutput<H::Output>>>> {
        self.map_with(method, urls, true)
    }

    fn map_with(
        &self,
        method: &str,
        urls: &[String],
        save: bool,
    ) -> Result<Vec<TaskOutcome<CrawlOutput<H::Output>>>> {
        let method = HttpMethod::dispatch(method)?;
        let pool = self.pool()?;
        pool.map(urls.to_vec(), self.single_task(method, save)?)
    }

    // ===== Fire-and-forget Submission =====

    pub fn async_apply(
        &self,
        method: &str,
        urls: &[String],
        on_success: Option<SuccessCallback<CrawlOutput<H::Output>>>,
        on_error: Option<ErrorCallback>,
    ) -> Result<()> {
        let method = HttpMethod::dispatch(method)?;
        let pool = self.pool()?;
        pool.async_apply(
            divide_urls(urls, self.workers),
            self.task(method, false)?,
            on_success,
            on_error,
        )
    }

    pub fn async_map(
        &self,
        method: &str,
        urls: &[String],
        on_success: Option<SuccessCallback<CrawlOutput<H::Output>>>,
        on_error: Option<ErrorCallback>,
    ) -> Result<()> {
        let method = HttpMethod::dispatch(method)?;
        let pool = self.pool()?;
        pool.async_map(
            urls.to_vec(),
            self.single_task(method, false)?,
            on_success,
            on_error,
        )
    }

    /// Waits for the fire-and-forget tasks and takes their outcomes
    pub fn get_result(&self) -> Result<Vec<TaskOutcome<CrawlOutput<H::Output>>>> {
        Ok(self.pool()?.get_result())
    }

    // ===== Lifecycle =====

    /// Lets queued tasks finish, then stops the workers
    pub fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close();
            tracing::info!("Pool crawler closed");
        }
    }

    /// Stops the workers without running queued tasks
    pub fn terminate(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.terminate();
            tracing::info!("Pool crawler terminated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fixtures::{expected, factory, urls, FakeTransport, StatusParser, Uppercase};
    use crate::persistence::MemorySink;
    use std::sync::Mutex;

    type Crawler = PoolCrawler<FakeTransport, StatusParser, Uppercase>;

    fn started(workers: usize) -> Crawler {
        let mut crawler = PoolCrawler::new(factory(), workers);
        crawler.init(true, 0).unwrap();
        crawler
    }

    fn flatten(outcomes: Vec<TaskOutcome<CrawlOutput<String>>>) -> Vec<String> {
        outcomes
            .into_iter()
            .flat_map(|outcome| outcome.result.unwrap().into_vec())
            .collect()
    }

    #[test]
    fn test_not_started() {
        let crawler: Crawler = PoolCrawler::new(factory(), 2);
        assert!(!crawler.is_running());
        assert!(matches!(
            crawler.apply("GET", &urls(2)),
            Err(CrawlError::PoolClosed)
        ));
    }

    #[test]
    fn test_init_validates_before_starting() {
        let mut crawler: Crawler = PoolCrawler::new(factory(), 2);
        assert!(crawler.init(false, 0).is_err());
        assert!(!crawler.is_running());

        let mut crawler: Crawler = PoolCrawler::new(factory(), 0);
        assert!(crawler.init(true, 0).is_err());
    }

    #[test]
    fn test_apply_and_map() {
        let crawler = started(3);
        let urls = urls(8);

        let outcomes = crawler.apply("GET", &urls).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(flatten(outcomes), expected(&urls));

        let outcomes = crawler.map("get", &urls).unwrap();
        assert_eq!(outcomes.len(), 8);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o.result, Ok(CrawlOutput::Single(_)))));
        assert_eq!(flatten(outcomes), expected(&urls));
    }

    #[test]
    fn test_async_map_with_callbacks() {
        let crawler = started(2);
        let successes = Arc::new(Mutex::new(0));
        let errors = Arc::new(Mutex::new(0));

        let on_success: SuccessCallback<CrawlOutput<String>> = {
            let successes = Arc::clone(&successes);
            Arc::new(move |_: &CrawlOutput<String>| *successes.lock().unwrap() += 1)
        };
        let on_error: ErrorCallback = {
            let errors = Arc::clone(&errors);
            Arc::new(move |_: &CrawlError| *errors.lock().unwrap() += 1)
        };

        let mut urls = urls(5);
        urls[2] = "http://a.test/down".to_string();
        crawler
            .async_map("GET", &urls, Some(on_success), Some(on_error))
            .unwrap();

        let outcomes = crawler.get_result().unwrap();
        assert_eq!(outcomes.len(), 5);
        assert!(outcomes[2].result.is_err());
        assert_eq!(*successes.lock().unwrap(), 4);
        assert_eq!(*errors.lock().unwrap(), 1);
    }

    #[test]
    fn test_async_apply_then_get_result() {
        let crawler = started(2);
        let urls = urls(6);

        crawler.async_apply("GET", &urls, None, None).unwrap();
        assert_eq!(flatten(crawler.get_result().unwrap()), expected(&urls));
    }

    #[test]
    fn test_apply_and_save() {
        let sink = Arc::new(MemorySink::<String>::new());
        let mut crawler = PoolCrawler::new(factory().with_persistence(Arc::clone(&sink)), 2);
        crawler.init(false, 2).unwrap();

        let urls = urls(4);
        crawler.apply_and_save("GET", &urls).unwrap();
        assert_eq!(sink.save_count(), 2);

        let mut rows = sink.rows();
        rows.sort();
        assert_eq!(rows, expected(&urls));
    }

    #[test]
    fn test_close_and_terminate() {
        let mut crawler = started(2);
        assert!(crawler.is_running());

        crawler.close();
        assert!(!crawler.is_running());
        assert!(matches!(
            crawler.map("GET", &urls(1)),
            Err(CrawlError::PoolClosed)
        ));

        crawler.init(true, 0).unwrap();
        assert!(crawler.is_running());
        crawler.terminate();
        assert!(!crawler.is_running());
    }
}
