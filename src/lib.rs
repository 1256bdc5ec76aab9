//! Sumi-Crawler: a composable web data crawler
//!
//! This crate wires pluggable components (HTTP transports, response parsers,
//! data handlers and persistence sinks) into a small set of crawler roles,
//! with a retry/lifecycle wrapper around every request and a URL generator
//! that expands templated URLs by index, date, datetime or iterator.

pub mod components;
pub mod config;
pub mod crawler;
pub mod executor;
pub mod output;
pub mod persistence;
pub mod retry;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid HTTP method: '{0}'")]
    InvalidMethod(String),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("No response for {method} {url}")]
    NoResponse { method: String, url: String },

    #[error("Unexpected HTTP status {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Data handling error: {0}")]
    Handler(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Worker pool is not running")]
    PoolClosed,

    #[error("Worker {task_id} panicked")]
    WorkerPanicked { task_id: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL template and generation errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Base URL cannot be empty")]
    EmptyBase,

    #[error("No placeholder found in '{0}', expected one of {{index}}, {{date}}, {{datetime}} or {{iterator}}")]
    MissingPlaceholder(String),

    #[error("Only one placeholder is allowed per template, found {0:?}")]
    MultiplePlaceholders(Vec<String>),

    #[error("The {rule} rule requires {needed}")]
    MissingParameters {
        rule: &'static str,
        needed: &'static str,
    },

    #[error("Invalid range value: {0}")]
    InvalidRange(String),

    #[error("Invalid formatter '{formatter}': {reason}")]
    InvalidFormatter { formatter: String, reason: String },

    #[error("Cannot parse '{value}' with format '{format}': {source}")]
    DateParse {
        value: String,
        format: String,
        source: chrono::ParseError,
    },

    #[error("Period must be positive, got {0}")]
    NonPositivePeriod(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Unsupported template value: {0}")]
    UnsupportedValue(String),

    #[error("Generated URL '{url}' is invalid: {source}")]
    Invalid {
        url: String,
        source: ::url::ParseError,
    },
}

/// Persistence sink errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("No crawl run is active; begin a run before saving")]
    NoActiveRun,

    #[error("Sink lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Sumi-Crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for persistence operations
pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;

// Re-export commonly used types
pub use components::{
    AsyncTransport, DataHandler, HttpMethod, RequestDescriptor, ResponseParser, Transport,
};
pub use config::Config;
pub use crawler::{
    AsyncCrawler, CrawlOutput, CrawlerFactory, ExecutorCrawler, PoolCrawler, SimpleCrawler,
    UrlInput,
};
pub use executor::{ConcurrencyGuard, TaskOutcome};
pub use persistence::PersistenceSink;
pub use retry::{AsyncRequestHooks, CallbackHooks, DefaultHooks, RequestHooks, RetryPolicy};
pub use crate::url::{Period, Placeholder, UrlGenerator};
