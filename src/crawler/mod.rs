//! Crawler roles
//!
//! This module turns registered components into crawls:
//! - [`CrawlerFactory`] holds the transport, parser, handler and sink
//! - [`SimpleCrawler`] runs the pipeline sequentially
//! - [`ExecutorCrawler`] spreads URLs over scoped worker threads
//! - [`PoolCrawler`] submits work to a long-lived worker pool
//! - [`AsyncCrawler`] runs URL chunks as concurrent futures
//! - [`run_crawl`] drives one of them from a configuration file

mod async_crawler;
mod executor;
mod factory;
#[cfg(test)]
mod fixtures;
mod pool;
mod runner;
mod simple;

pub use async_crawler::AsyncCrawler;
pub use executor::ExecutorCrawler;
pub use factory::CrawlerFactory;
pub use pool::PoolCrawler;
pub use runner::{run_crawl, CrawlReport};
pub use simple::SimpleCrawler;

use std::slice;

/// What to crawl: one URL or a list of them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlInput {
    Single(String),
    Batch(Vec<String>),
}

impl UrlInput {
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(urls) => urls.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_urls(self) -> Vec<String> {
        match self {
            Self::Single(url) => vec![url],
            Self::Batch(urls) => urls,
        }
    }
}

impl From<&str> for UrlInput {
    fn from(url: &str) -> Self {
        Self::Single(url.to_string())
    }
}

impl From<String> for UrlInput {
    fn from(url: String) -> Self {
        Self::Single(url)
    }
}

impl From<Vec<String>> for UrlInput {
    fn from(urls: Vec<String>) -> Self {
        Self::Batch(urls)
    }
}

impl From<Vec<&str>> for UrlInput {
    fn from(urls: Vec<&str>) -> Self {
        Self::Batch(urls.into_iter().map(str::to_string).collect())
    }
}

impl From<&[String]> for UrlInput {
    fn from(urls: &[String]) -> Self {
        Self::Batch(urls.to_vec())
    }
}

/// Result of a run: mirrors the shape of the [`UrlInput`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutput<T> {
    Single(T),
    Batch(Vec<T>),
}

impl<T> CrawlOutput<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Single(value) => slice::from_ref(value),
            Self::Batch(values) => values,
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Single(value) => vec![value],
            Self::Batch(values) => values,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}
