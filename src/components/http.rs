//! reqwest-backed transports
//!
//! This module handles the actual HTTP traffic:
//! - Building HTTP clients with the configured user agent string
//! - Sending each verb through a blocking or an async client
//! - Capturing status, Content-Type and body for the parser
//!
//! Non-2xx responses are returned, not raised: deciding what a 404 means
//! is the parser's job. Network failures become [`CrawlError::Http`] and
//! go through the retry policy.

use super::transport::{AsyncTransport, Transport};
use crate::config::UserAgentConfig;
use crate::retry::{AsyncRequestHooks, LoggingHooks, RequestHooks};
use crate::{CrawlError, Result};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Method};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// What the transports hand to the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    /// Content-Type header value, empty when absent
    pub content_type: String,
    pub body: String,
}

/// Formats the user agent: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds the async HTTP client
///
/// # Example
///
/// ```no_run
/// use sumi_crawler::config::UserAgentConfig;
/// use sumi_crawler::components::build_async_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiCrawler".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_async_client(&config).unwrap();
/// ```
pub fn build_async_client(config: &UserAgentConfig) -> std::result::Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the blocking HTTP client
///
/// The blocking client runs its own runtime internally, so it must not be
/// created or dropped from inside an async context.
pub fn build_blocking_client(
    config: &UserAgentConfig,
) -> std::result::Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .gzip(true)
        .brotli(true)
        .build()
}

fn content_type(headers: &reqwest::header::HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn http_error(url: &str, source: reqwest::Error) -> CrawlError {
    CrawlError::Http {
        url: url.to_string(),
        source,
    }
}

/// Blocking transport over `reqwest::blocking`
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    hooks: Box<dyn RequestHooks<Option<HttpResponse>>>,
}

impl ReqwestTransport {
    /// Wraps a client; lifecycle events are traced with [`LoggingHooks`]
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self {
            client,
            hooks: Box::new(LoggingHooks),
        }
    }

    pub fn from_config(config: &UserAgentConfig) -> Result<Self> {
        Ok(Self::new(build_blocking_client(config)?))
    }

    /// Replaces the lifecycle hooks
    pub fn with_hooks(mut self, hooks: impl RequestHooks<Option<HttpResponse>> + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    fn send(&self, method: Method, url: &str) -> Result<Option<HttpResponse>> {
        let response = self
            .client
            .request(method, url)
            .send()
            .map_err(|e| http_error(url, e))?;

        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let content_type = content_type(response.headers());
        let body = response.text().map_err(|e| http_error(url, e))?;

        Ok(Some(HttpResponse {
            url: final_url,
            status,
            content_type,
            body,
        }))
    }
}

impl Transport for ReqwestTransport {
    type Response = HttpResponse;

    fn get(&self, url: &str) -> Result<Option<HttpResponse>> {
        self.send(Method::GET, url)
    }

    fn post(&self, url: &str) -> Result<Option<HttpResponse>> {
        self.send(Method::POST, url)
    }

    fn put(&self, url: &str) -> Result<Option<HttpResponse>> {
        self.send(Method::PUT, url)
    }

    fn delete(&self, url: &str) -> Result<Option<HttpResponse>> {
        self.send(Method::DELETE, url)
    }

    fn head(&self, url: &str) -> Result<Option<HttpResponse>> {
        self.send(Method::HEAD, url)
    }

    fn option(&self, url: &str) -> Result<Option<HttpResponse>> {
        self.send(Method::OPTIONS, url)
    }

    fn hooks(&self) -> &dyn RequestHooks<Option<HttpResponse>> {
        self.hooks.as_ref()
    }
}

/// Async transport over `reqwest::Client`
pub struct AsyncReqwestTransport {
    client: reqwest::Client,
    hooks: Box<dyn AsyncRequestHooks<Option<HttpResponse>>>,
}

impl AsyncReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            hooks: Box::new(LoggingHooks),
        }
    }

    pub fn from_config(config: &UserAgentConfig) -> Result<Self> {
        Ok(Self::new(build_async_client(config)?))
    }

    pub fn with_hooks(
        mut self,
        hooks: impl AsyncRequestHooks<Option<HttpResponse>> + 'static,
    ) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    async fn send(&self, method: Method, url: &str) -> Result<Option<HttpResponse>> {
        let response = self
            .client
            .request(method, url)
            .send()
            .await
            .map_err(|e| http_error(url, e))?;

        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let content_type = content_type(response.headers());
        let body = response.text().await.map_err(|e| http_error(url, e))?;

        Ok(Some(HttpResponse {
            url: final_url,
            status,
            content_type,
            body,
        }))
    }
}

#[async_trait]
impl AsyncTransport for AsyncReqwestTransport {
    type Response = HttpResponse;

    async fn get(&self, url: &str) -> Result<Option<HttpResponse>> {
        self.send(Method::GET, url).await
    }

    async fn post(&self, url: &str) -> Result<Option<HttpResponse>> {
        self.send(Method::POST, url).await
    }

    async fn put(&self, url: &str) -> Result<Option<HttpResponse>> {
        self.send(Method::PUT, url).await
    }

    async fn delete(&self, url: &str) -> Result<Option<HttpResponse>> {
        self.send(Method::DELETE, url).await
    }

    async fn head(&self, url: &str) -> Result<Option<HttpResponse>> {
        self.send(Method::HEAD, url).await
    }

    async fn option(&self, url: &str) -> Result<Option<HttpResponse>> {
        self.send(Method::OPTIONS, url).await
    }

    fn hooks(&self) -> &dyn AsyncRequestHooks<Option<HttpResponse>> {
        self.hooks.as_ref()
    }
}
