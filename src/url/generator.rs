//! Expansion of a URL template into concrete URLs

use super::formatter::parse_point;
use super::template::UrlTemplate;
use super::Placeholder;
use crate::{UrlError, UrlResult};
use chrono::{Duration, NaiveDateTime};
use std::ops::RangeInclusive;

const DATE_OUTPUT: &str = "%Y%m%d";
const DATETIME_OUTPUT: &str = "%Y%m%d%H%M%S";

/// Default formatter for the date rules
pub const DEFAULT_FORMATTER: &str = "yyyymmdd";

/// Step between consecutive date or datetime values
///
/// The date rule only uses `days`; the datetime rule uses the sum of all
/// four fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Default for Period {
    fn default() -> Self {
        Self::days(1)
    }
}

impl Period {
    pub fn days(days: i64) -> Self {
        Self {
            days,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }

    pub fn hours(hours: i64) -> Self {
        Self {
            days: 0,
            hours,
            minutes: 0,
            seconds: 0,
        }
    }

    /// The total step
    ///
    /// # Errors
    ///
    /// Returns [`UrlError::InvalidPeriod`] when a field or the sum does not
    /// fit a chrono duration.
    pub fn to_duration(&self) -> UrlResult<Duration> {
        [
            Duration::try_days(self.days),
            Duration::try_hours(self.hours),
            Duration::try_minutes(self.minutes),
            Duration::try_seconds(self.seconds),
        ]
        .into_iter()
        .try_fold(Duration::zero(), |total, part| {
            part.and_then(|part| total.checked_add(&part))
        })
        .ok_or_else(|| self.out_of_range())
    }

    fn out_of_range(&self) -> UrlError {
        UrlError::InvalidPeriod(format!("{:?} is out of range", self))
    }
}

/// Values for the iterator rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IteratorValues {
    /// One URL per element
    Sequence(Vec<String>),
    /// One URL per entry, rendered `key=value`, in insertion order
    Mapping(Vec<(String, String)>),
}

/// Builds the list of URLs to crawl from one template
///
/// Generation is pure: calling [`generate`](Self::generate) twice returns
/// two equal, independent lists.
///
/// # Example
///
/// ```
/// use sumi_crawler::url::{Period, UrlGenerator};
///
/// let generator = UrlGenerator::new("https://example.com/report?day={date}")
///     .unwrap()
///     .with_range("2024-01-30", "2024-02-02")
///     .with_formatter("yyyy-mm-dd")
///     .with_period(Period::days(2));
///
/// assert_eq!(
///     generator.generate().unwrap(),
///     vec![
///         "https://example.com/report?day=20240130",
///         "https://example.com/report?day=20240201",
///     ]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct UrlGenerator {
    template: UrlTemplate,
    start: Option<String>,
    end: Option<String>,
    formatter: String,
    iterator: Option<IteratorValues>,
    period: Period,
}

impl UrlGenerator {
    /// Creates a generator for `base`
    ///
    /// # Errors
    ///
    /// Fails when `base` is empty or does not carry exactly one kind of
    /// placeholder.
    pub fn new(base: &str) -> UrlResult<Self> {
        Ok(Self {
            template: UrlTemplate::parse(base)?,
            start: None,
            end: None,
            formatter: DEFAULT_FORMATTER.to_string(),
            iterator: None,
            period: Period::default(),
        })
    }

    /// Sets the inclusive range for the index, date and datetime rules
    ///
    /// Index bounds may be given as integers or integer strings.
    pub fn with_range(mut self, start: impl ToString, end: impl ToString) -> Self {
        self.start = Some(start.to_string());
        self.end = Some(end.to_string());
        self
    }

    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = formatter.into();
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    /// Sets a sequence of values for the iterator rule
    pub fn with_iterator<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.iterator = Some(IteratorValues::Sequence(
            values.into_iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    /// Sets key/value pairs for the iterator rule
    pub fn with_mapping<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: ToString,
    {
        self.iterator = Some(IteratorValues::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        self
    }

    pub fn base_url(&self) -> &str {
        self.template.base()
    }

    pub fn placeholder(&self) -> Placeholder {
        self.template.placeholder()
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn is_index_rule(&self) -> bool {
        self.placeholder() == Placeholder::Index
    }

    pub fn is_date_rule(&self) -> bool {
        self.placeholder() == Placeholder::Date
    }

    pub fn is_datetime_rule(&self) -> bool {
        self.placeholder() == Placeholder::Datetime
    }

    pub fn is_iterator_rule(&self) -> bool {
        self.placeholder() == Placeholder::Iterator
    }

    /// Returns a lazy iterator over the URLs
    ///
    /// All parameters are validated up front, so the iterator itself
    /// cannot fail.
    pub fn iter(&self) -> UrlResult<Urls<'_>> {
        let values = match self.placeholder() {
            Placeholder::Index => self.index_values()?,
            Placeholder::Date => self.date_values(false)?,
            Placeholder::Datetime => self.date_values(true)?,
            Placeholder::Iterator => match &self.iterator {
                Some(IteratorValues::Sequence(items)) => Values::Sequence(items.iter()),
                Some(IteratorValues::Mapping(entries)) => Values::Mapping(entries.iter()),
                None => {
                    return Err(UrlError::MissingParameters {
                        rule: "iterator",
                        needed: "iterator values",
                    })
                }
            },
        };

        Ok(Urls {
            template: &self.template,
            values,
        })
    }

    /// Expands the template into every URL, in order
    pub fn generate(&self) -> UrlResult<Vec<String>> {
        let urls: Vec<String> = self.iter()?.collect();
        tracing::debug!(
            "Generated {} URLs from {} ({} rule)",
            urls.len(),
            self.base_url(),
            self.placeholder()
        );
        Ok(urls)
    }

    /// Like [`generate`](Self::generate), also checking each URL parses
    pub fn generate_checked(&self) -> UrlResult<Vec<String>> {
        let urls = self.generate()?;
        for url in &urls {
            ::url::Url::parse(url).map_err(|source| UrlError::Invalid {
                url: url.clone(),
                source,
            })?;
        }
        Ok(urls)
    }

    fn range(&self, rule: &'static str) -> UrlResult<(&str, &str)> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => Ok((start.as_str(), end.as_str())),
            _ => Err(UrlError::MissingParameters {
                rule,
                needed: "start and end",
            }),
        }
    }

    fn index_values(&self) -> UrlResult<Values<'_>> {
        let (start, end) = self.range("index")?;
        Ok(Values::Index(parse_index(start)?..=parse_index(end)?))
    }

    fn date_values(&self, with_time: bool) -> UrlResult<Values<'_>> {
        let rule = if with_time { "datetime" } else { "date" };
        let (start, end) = self.range(rule)?;

        let step = if with_time {
            self.period.to_duration()?
        } else {
            Duration::try_days(self.period.days).ok_or_else(|| self.period.out_of_range())?
        };
        if step <= Duration::zero() {
            return Err(UrlError::NonPositivePeriod(format!(
                "{:?} for the {} rule",
                self.period, rule
            )));
        }

        let mut start = parse_point(start, &self.formatter)?;
        let mut end = parse_point(end, &self.formatter)?;
        if !with_time {
            start = start.date().and_time(Default::default());
            end = end.date().and_time(Default::default());
        }

        Ok(Values::Dates {
            next: Some(start),
            end,
            step,
            output: if with_time { DATETIME_OUTPUT } else { DATE_OUTPUT },
        })
    }
}

fn parse_index(value: &str) -> UrlResult<i64> {
    value.trim().parse().map_err(|_| {
        UrlError::InvalidRange(format!("'{}' is not an integer index", value))
    })
}

enum Values<'a> {
    Index(RangeInclusive<i64>),
    Dates {
        next: Option<NaiveDateTime>,
        end: NaiveDateTime,
        step: Duration,
        output: &'static str,
    },
    Sequence(std::slice::Iter<'a, String>),
    Mapping(std::slice::Iter<'a, (String, String)>),
}

/// Lazy iterator over generated URLs, see [`UrlGenerator::iter`]
pub struct Urls<'a> {
    template: &'a UrlTemplate,
    values: Values<'a>,
}

impl Iterator for Urls<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let value = match &mut self.values {
            Values::Index(range) => range.next()?.to_string(),
            Values::Dates {
                next,
                end,
                step,
                output,
            } => {
                let current = next.filter(|point| *point <= *end)?;
                *next = current.checked_add_signed(*step);
                current.format(*output).to_string()
            }
            Values::Sequence(items) => items.next()?.clone(),
            Values::Mapping(entries) => {
                let (key, value) = entries.next()?;
                format!("{}={}", key, value)
            }
        };

        Some(self.template.fill(&value))
    }
}
