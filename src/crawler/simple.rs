//! Sequential crawl pipeline
//!
//! Every URL goes through the same steps, one after the other:
//! send the request (retry wrapped), parse the response, process the parsed
//! content, and optionally persist the result set.

use super::factory::CrawlerFactory;
use super::{CrawlOutput, UrlInput};
use crate::components::{DataHandler, HttpMethod, RequestDescriptor, ResponseParser, Transport};
use crate::retry::DEFAULT_RETRY_BUDGET;
use crate::{ConfigError, CrawlError, Result};

/// Crawls URLs one at a time on the calling thread
pub struct SimpleCrawler<T, P, H: DataHandler> {
    factory: CrawlerFactory<T, P, H>,
    retry: u32,
}

impl<T, P, H> SimpleCrawler<T, P, H>
where
    T: Transport,
    P: ResponseParser<Response = T::Response>,
    H: DataHandler<Input = P::Output>,
{
    pub fn new(factory: CrawlerFactory<T, P, H>) -> Self {
        Self {
            factory,
            retry: DEFAULT_RETRY_BUDGET,
        }
    }

    /// Sets the attempt budget used by [`run`](Self::run)
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry(&self) -> u32 {
        self.retry
    }

    pub fn factory(&self) -> &CrawlerFactory<T, P, H> {
        &self.factory
    }

    // ===== Pipeline Steps =====

    /// Sends one request through the transport's retry policy
    ///
    /// # Errors
    ///
    /// * [`CrawlError::InvalidMethod`] before any attempt when `method`
    ///   names no known verb
    /// * [`CrawlError::NoResponse`] when the verb is not implemented by the
    ///   transport (or its done hook dropped the response)
    /// * whatever the retry policy finally returns
    pub fn send_http_request(&self, method: &str, url: &str, retry: u32) -> Result<T::Response> {
        let method = HttpMethod::dispatch(method)?;
        self.request(method, url, retry)
    }

    fn request(&self, method: HttpMethod, url: &str, retry: u32) -> Result<T::Response> {
        let request = RequestDescriptor::new(method, url, retry);
        self.factory
            .transport
            .request(&request)?
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

    /// Hands `data` to the registered sink
    ///
    /// # Errors
    ///
    /// Returns a validation error when no sink is registered, or the
    /// sink's own error. Saves are not retried.
    pub fn persist(&self, data: &[H::Output]) -> Result<()> {
        let sink = self.factory.persistence.as_ref().ok_or_else(|| {
            ConfigError::Validation("no persistence sink registered".to_string())
        })?;
        sink.save(data)
    }

    // ===== Pipeline =====

    /// Requests `url` and parses the response
    pub fn crawl(&self, method: &str, url: &str, retry: u32) -> Result<P::Output> {
        let response = self.send_http_request(method, url, retry)?;
        self.parse_http_response(response)
    }

    /// Crawls and processes one URL with an already resolved method
    pub fn process_url(&self, method: HttpMethod, url: &str) -> Result<H::Output> {
        tracing::debug!("Crawling {} {}", method, url);
        let response = self.request(method, url, self.retry)?;
        let parsed = self.parse_http_response(response)?;
        self.data_process(parsed)
    }

    /// Crawls a list of URLs in order, stopping at the first failure
    pub fn process_urls(&self, method: HttpMethod, urls: &[String]) -> Result<Vec<H::Output>> {
        urls.iter()
            .map(|url| self.process_url(method, url))
            .collect()
    }

    /// Crawls and processes a single URL or a batch
    ///
    /// A batch is crawled sequentially and its results keep the input
    /// order. The first failing URL aborts the batch.
    pub fn run(&self, method: &str, input: impl Into<UrlInput>) -> Result<CrawlOutput<H::Output>> {
        let method = HttpMethod::dispatch(method)?;
        match input.into() {
            UrlInput::Single(url) => self.process_url(method, &url).map(CrawlOutput::Single),
            UrlInput::Batch(urls) => self.process_urls(method, &urls).map(CrawlOutput::Batch),
        }
    }

    /// [`run`](Self::run), then persist the whole result set
    ///
    /// Nothing is persisted when any URL fails.
    pub fn run_and_save(
        &self,
        method: &str,
        input: impl Into<UrlInput>,
    ) -> Result<CrawlOutput<H::Output>> {
        let output = self.run(method, input)?;
        self.persist(output.as_slice())?;
        Ok(output)
    }
}
