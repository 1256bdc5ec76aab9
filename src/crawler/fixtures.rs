//! Deterministic components shared by the crawler role tests
//!
//! URLs steer the fake transports: a URL containing `down` fails at the
//! transport, `missing` answers 404, anything else answers 200. A
//! `/slow` segment makes the async transport sleep before answering.

use super::factory::CrawlerFactory;
use crate::components::{AsyncTransport, DataHandler, ResponseParser, Transport};
use crate::{CrawlError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeResponse {
    pub status: u16,
    pub url: String,
}

fn answer(url: &str) -> Result<Option<FakeResponse>> {
    if url.contains("down") {
        return Err(CrawlError::Other(anyhow::anyhow!("connection refused")));
    }
    let status = if url.contains("missing") { 404 } else { 200 };
    Ok(Some(FakeResponse {
        status,
        url: url.to_string(),
    }))
}

/// Implements GET only
#[derive(Debug, Default)]
pub struct FakeTransport {
    calls: AtomicUsize,
}

impl FakeTransport {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for FakeTransport {
    type Response = FakeResponse;

    fn get(&self, url: &str) -> Result<Option<FakeResponse>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        answer(url)
    }
}

#[derive(Debug, Default)]
pub struct FakeAsyncTransport {
    calls: AtomicUsize,
}

impl FakeAsyncTransport {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AsyncTransport for FakeAsyncTransport {
    type Response = FakeResponse;

    async fn get(&self, url: &str) -> Result<Option<FakeResponse>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("/slow") {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        answer(url)
    }
}

/// 200 gives the body text, anything else is an error
#[derive(Debug, Default)]
pub struct StatusParser;

impl ResponseParser for StatusParser {
    type Response = FakeResponse;
    type Output = String;

    fn get_status_code(&self, response: &FakeResponse) -> u16 {
        response.status
    }

    fn handling_200_response(&self, response: FakeResponse) -> Result<String> {
        Ok(format!("body of {}", response.url))
    }

    fn handling_not_200_response(&self, response: FakeResponse) -> Result<String> {
        Err(CrawlError::UnexpectedStatus {
            url: response.url,
            status: response.status,
        })
    }
}

#[derive(Debug, Default)]
pub struct Uppercase;

impl DataHandler for Uppercase {
    type Input = String;
    type Output = String;

    fn process(&self, parsed: String) -> Result<String> {
        Ok(parsed.to_uppercase())
    }
}

pub fn factory() -> CrawlerFactory<FakeTransport, StatusParser, Uppercase> {
    CrawlerFactory::new(FakeTransport::default(), StatusParser, Uppercase)
}

pub fn async_factory() -> CrawlerFactory<FakeAsyncTransport, StatusParser, Uppercase> {
    CrawlerFactory::new(FakeAsyncTransport::default(), StatusParser, Uppercase)
}

pub fn urls(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("http://a.test/{}", i)).collect()
}

pub fn expected(urls: &[String]) -> Vec<String> {
    urls.iter()
        .map(|url| format!("body of {}", url).to_uppercase())
        .collect()
}
