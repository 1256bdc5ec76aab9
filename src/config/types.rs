use crate::url::{Period, UrlGenerator};
use crate::{UrlError, UrlResult};
use serde::Deserialize;
use std::fmt;

/// Main configuration structure for Sumi-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub target: TargetConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    pub output: OutputConfig,
}

/// Which crawler role runs the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlerRole {
    Simple,
    Executor,
    Pool,
    Async,
}

impl fmt::Display for CrawlerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Simple => "simple",
            Self::Executor => "executor",
            Self::Pool => "pool",
            Self::Async => "async",
        })
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    pub role: CrawlerRole,

    /// HTTP method, matched leniently (e.g. "get")
    #[serde(default = "default_method")]
    pub method: String,

    /// Total attempts per request
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// Worker count for the concurrent roles
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Serialize saves with a lock instead of a semaphore
    #[serde(default = "default_lock")]
    pub lock: bool,

    /// Semaphore permits when `lock` is false
    #[serde(rename = "sema-value", default)]
    pub sema_value: usize,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_retry() -> u32 {
    crate::retry::DEFAULT_RETRY_BUDGET
}

fn default_workers() -> usize {
    1
}

fn default_lock() -> bool {
    true
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// A range bound written either as a number or as text
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RangeValue {
    Integer(i64),
    Text(String),
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// A scalar substituted into the `{iterator}` placeholder
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TemplateValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl TemplateValue {
    /// Converts a TOML scalar; arrays and tables have no text form
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::Integer(value) => Some(Self::Integer(*value)),
            toml::Value::Float(value) => Some(Self::Float(*value)),
            toml::Value::Boolean(value) => Some(Self::Boolean(*value)),
            toml::Value::String(value) => Some(Self::Text(value.clone())),
            toml::Value::Datetime(value) => Some(Self::Text(value.to_string())),
            toml::Value::Array(_) | toml::Value::Table(_) => None,
        }
    }
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{}", value),
            // Debug keeps the fraction of whole floats: 2.0, not 2
            Self::Float(value) => write!(f, "{:?}", value),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// Step between date or datetime values
///
/// Omitted fields keep their defaults, so `hours = 12` alone steps one day
/// and twelve hours. Sub-day steps need an explicit `days = 0`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PeriodConfig {
    #[serde(default = "default_period_days")]
    pub days: i64,
    #[serde(default)]
    pub hours: i64,
    #[serde(default)]
    pub minutes: i64,
    #[serde(default)]
    pub seconds: i64,
}

fn default_period_days() -> i64 {
    1
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            days: default_period_days(),
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

impl From<PeriodConfig> for Period {
    fn from(config: PeriodConfig) -> Self {
        Period {
            days: config.days,
            hours: config.hours,
            minutes: config.minutes,
            seconds: config.seconds,
        }
    }
}

/// The URL template and the values it is expanded with
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Template with one placeholder
    pub url: String,

    pub start: Option<RangeValue>,

    pub end: Option<RangeValue>,

    /// Date layout such as "yyyy-mm-dd" or "%Y%m%d"
    pub formatter: Option<String>,

    /// Values for the `{iterator}` placeholder
    pub iterator: Option<Vec<TemplateValue>>,

    /// `key=value` pairs for the `{iterator}` placeholder, in document order
    pub mapping: Option<toml::Table>,

    /// Step for date rules, one day when omitted
    pub period: Option<PeriodConfig>,
}

impl TargetConfig {
    /// Builds the URL generator this section describes
    pub fn generator(&self) -> UrlResult<UrlGenerator> {
        let mut generator = UrlGenerator::new(&self.url)?;

        if let (Some(start), Some(end)) = (&self.start, &self.end) {
            generator = generator.with_range(start, end);
        }
        if let Some(formatter) = &self.formatter {
            generator = generator.with_formatter(formatter.clone());
        }
        if let Some(period) = self.period {
            generator = generator.with_period(period.into());
        }
        if let Some(values) = &self.iterator {
            generator = generator.with_iterator(values);
        }
        if let Some(mapping) = &self.mapping {
            generator = generator.with_mapping(mapping_entries(mapping)?);
        }

        Ok(generator)
    }
}

fn mapping_entries(mapping: &toml::Table) -> UrlResult<Vec<(String, TemplateValue)>> {
    mapping
        .iter()
        .map(|(key, value)| {
            TemplateValue::from_toml(value)
                .map(|value| (key.clone(), value))
                .ok_or_else(|| {
                    UrlError::UnsupportedValue(format!(
                        "mapping entry '{}' must be a string, number or boolean",
                        key
                    ))
                })
        })
        .collect()
}

/// How responses are parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParserKind {
    /// Store the JSON body as is
    Json,
    /// An array of objects or arrays, one row each
    #[default]
    JsonRows,
    /// Rows of an HTML table
    HtmlTable,
}

/// Response parser configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    #[serde(default)]
    pub kind: ParserKind,

    /// CSS selector for table rows
    #[serde(default = "default_selector")]
    pub selector: String,

    /// JSON field holding the rows
    pub field: Option<String>,

    /// Drop the first row of every response
    #[serde(rename = "skip-header", default)]
    pub skip_header: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            kind: ParserKind::default(),
            selector: default_selector(),
            field: None,
            skip_header: false,
        }
    }
}

fn default_selector() -> String {
    crate::components::DEFAULT_ROW_SELECTOR.to_string()
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Name the saved rows are filed under
    #[serde(default = "default_destination")]
    pub destination: String,
}

fn default_destination() -> String {
    "crawl".to_string()
}
