//! Async crawler role
//!
//! URLs are chunked like the executor role, but every chunk is a future on
//! the current task instead of a thread. Chunks make progress whenever
//! another chunk waits on the network; within a chunk URLs are crawled in
//! order.

use super::factory::CrawlerFactory;
use super::{CrawlOutput, UrlInput};
use crate::components::{
    AsyncTransport, DataHandler, HttpMethod, RequestDescriptor, ResponseParser,
};
use crate::executor::{divide_urls, flatten_outcomes, ConcurrencyGuard, TaskOutcome};
use crate::retry::DEFAULT_RETRY_BUDGET;
use crate::{ConfigError, CrawlError, Result};
use futures::future::join_all;

pub struct AsyncCrawler<T, P, H: DataHandler> {
    factory: CrawlerFactory<T, P, H>,
    retry: u32,
    workers: usize,
    guard: ConcurrencyGuard,
}

impl<T, P, H> AsyncCrawler<T, P, H>
where
    T: AsyncTransport,
    P: ResponseParser<Response = T::Response>,
    H: DataHandler<Input = P::Output>,
{
    /// # Errors
    ///
    /// Returns a validation error when `workers` is 0.
    pub fn new(factory: CrawlerFactory<T, P, H>, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(
                ConfigError::Validation("worker count must be at least 1".to_string()).into(),
            );
        }

        Ok(Self {
            factory,
            retry: DEFAULT_RETRY_BUDGET,
            workers,
            guard: ConcurrencyGuard::lock(),
        })
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_guard(mut self, guard: ConcurrencyGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn factory(&self) -> &CrawlerFactory<T, P, H> {
        &self.factory
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    // ===== Pipeline Steps =====

    pub async fn send_http_request(
        &self,
        method: &str,
        url: &str,
        retry: u32,
    ) -> Result<T::Response> {
        let method = HttpMethod::dispatch(method)?;
        self.request(method, url, retry).await
    }

    async fn request(&self, method: HttpMethod, url: &str, retry: u32) -> Result<T::Response> {
        let request = RequestDescriptor::new(method, url, retry);
        self.factory
            .transport
            .request(&request)
            .await?
            .ok_or_else(|| CrawlError::NoResponse {
                method: method.to_string(),
                url: url.to_string(),
            })
    }

    pub fn parse_http_response(&self, response: T::Response) -> Result<P::Output> {
        self.factory.parser.parse_content(response)
    }

    pub fn data_process(&self, parsed: P::Output) -> Result<H::Output> {
        self.factory.handler.process(parsed)
    }

    pub fn persist(&self, data: &[H::Output]) -> Result<()> {
        let sink = self.factory.persistence.as_ref().ok_or_else(|| {
            ConfigError::Validation("no persistence sink registered".to_string())
        })?;
        sink.save(data)
    }

    // ===== Pipeline =====

    pub async fn crawl(&self, method: &str, url: &str, retry: u32) -> Result<P::Output> {
        let response = self.send_http_request(method, url, retry).await?;
        self.parse_http_response(response)
    }

    async fn process_url(&self, method: HttpMethod, url: &str) -> Result<H::Output> {
        tracing::debug!("Crawling {} {}", method, url);
        let response = self.request(method, url, self.retry).await?;
        let parsed = self.parse_http_response(response)?;
        self.data_process(parsed)
    }

    async fn process_urls(&self, method: HttpMethod, urls: &[String]) -> Result<Vec<H::Output>> {
        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            results.push(self.process_url(method, url).await?);
        }
        Ok(results)
    }

    /// Crawls `urls` as up to `workers` concurrent chunks
    ///
    /// Outcomes are in chunk order, so flattening them gives the results
    /// in input order.
    pub async fn run(
        &self,
        method: &str,
        urls: &[String],
    ) -> Result<Vec<TaskOutcome<Vec<H::Output>>>> {
        let method = HttpMethod::dispatch(method)?;
        let chunks = divide_urls(urls, self.workers);
        tracing::info!(
            "Crawling {} URLs in {} concurrent chunks",
            urls.len(),
            chunks.len()
        );

        let results = join_all(
            chunks
                .iter()
                .map(|chunk| self.process_urls(method, chunk)),
        )
        .await;

        Ok(outcomes(chunks, results))
    }

    /// Crawls one URL, or a batch through [`run`](Self::run)
    ///
    /// A failing chunk fails the whole batch here.
    pub async fn run_input(
        &self,
        method: &str,
        input: impl Into<UrlInput>,
    ) -> Result<CrawlOutput<H::Output>> {
        match input.into() {
            UrlInput::Single(url) => {
                let method = HttpMethod::dispatch(method)?;
                self.process_url(method, &url).await.map(CrawlOutput::Single)
            }
            UrlInput::Batch(urls) => {
                let outcomes = self.run(method, &urls).await?;
                flatten_outcomes(outcomes).map(CrawlOutput::Batch)
            }
        }
    }

    /// Like [`run`](Self::run), but each chunk is persisted once all of
    /// its URLs succeed
    ///
    /// Saves wait for the guard. Successful outcomes carry the number of
    /// saved results.
    pub async fn run_and_save(
        &self,
        method: &str,
        urls: &[String],
    ) -> Result<Vec<TaskOutcome<usize>>> {
        let method = HttpMethod::dispatch(method)?;
        let chunks = divide_urls(urls, self.workers);

        let results = join_all(chunks.iter().map(|chunk| async move {
            let data = self.process_urls(method, chunk).await?;
            let _permit = self.guard.acquire().await?;
            self.persist(&data)?;
            Ok::<_, CrawlError>(data.len())
        }))
        .await;

        Ok(outcomes(chunks, results))
    }
}

fn outcomes<T>(chunks: Vec<Vec<String>>, results: Vec<Result<T>>) -> Vec<TaskOutcome<T>> {
    chunks
        .into_iter()
        .zip(results)
        .enumerate()
        .map(|(task_id, (urls, result))| TaskOutcome::new(task_id, urls, result))
        .collect()
}
