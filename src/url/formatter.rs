//! Date formatter conversion and parsing
//!
//! Formatters come in two styles. A strptime pattern (anything containing
//! `%`, e.g. `%Y-%m-%d`) is used as is. A natural template such as
//! `yyyy-mm-dd HH:MM:SS` is tokenized:
//!
//! | Token           | Field  |
//! |-----------------|--------|
//! | `yyyy` / `YYYY` | year   |
//! | `mm`            | month  |
//! | `dd` / `DD`     | day    |
//! | `HH`            | hour   |
//! | `MM`            | minute |
//! | `SS` / `ss`     | second |
//!
//! Month and minute differ only by case. The separators `-`, `/`, `:`,
//! space and `T` are kept literally; any other character is rejected.

use crate::{UrlError, UrlResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const TOKENS: [(&str, &str); 9] = [
    ("yyyy", "%Y"),
    ("YYYY", "%Y"),
    ("mm", "%m"),
    ("dd", "%d"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("MM", "%M"),
    ("SS", "%S"),
    ("ss", "%S"),
];

const SEPARATORS: [char; 5] = ['-', '/', ':', ' ', 'T'];

/// Converts a formatter to a strftime pattern
///
/// # Example
///
/// ```
/// use sumi_crawler::url::to_strftime;
///
/// assert_eq!(to_strftime("yyyy-mm-dd").unwrap(), "%Y-%m-%d");
/// assert_eq!(to_strftime("yyyymmdd HH:MM").unwrap(), "%Y%m%d %H:%M");
/// assert_eq!(to_strftime("%d/%m/%Y").unwrap(), "%d/%m/%Y");
/// ```
pub fn to_strftime(formatter: &str) -> UrlResult<String> {
    if formatter.is_empty() {
        return Err(invalid(formatter, "formatter is empty"));
    }
    if formatter.contains('%') {
        return Ok(formatter.to_string());
    }

    let mut pattern = String::new();
    let mut rest = formatter;

    'outer: while !rest.is_empty() {
        for (token, spec) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                pattern.push_str(spec);
                rest = tail;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        match chars.next() {
            Some(c) if SEPARATORS.contains(&c) => {
                pattern.push(c);
                rest = chars.as_str();
            }
            Some(c) => {
                return Err(invalid(
                    formatter,
                    &format!("unrecognized character '{}'", c),
                ));
            }
            None => break,
        }
    }

    Ok(pattern)
}

fn invalid(formatter: &str, reason: &str) -> UrlError {
    UrlError::InvalidFormatter {
        formatter: formatter.to_string(),
        reason: reason.to_string(),
    }
}

/// Parses `value` with a formatter into a point in time
///
/// A date-only formatter yields midnight of that day.
pub fn parse_point(value: &str, formatter: &str) -> UrlResult<NaiveDateTime> {
    let format = to_strftime(formatter)?;

    match NaiveDateTime::parse_from_str(value, &format) {
        Ok(point) => Ok(point),
        Err(datetime_error) => NaiveDate::parse_from_str(value, &format)
            .map(|date| date.and_time(NaiveTime::default()))
            .map_err(|date_error| UrlError::DateParse {
                value: value.to_string(),
                format: format.clone(),
                source: if has_time_fields(&format) {
                    datetime_error
                } else {
                    date_error
                },
            }),
    }
}

fn has_time_fields(format: &str) -> bool {
    ["%H", "%M", "%S", "%T", "%R"]
        .iter()
        .any(|spec| format.contains(spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_natural_date_formatters() {
        assert_eq!(to_strftime("yyyymmdd").unwrap(), "%Y%m%d");
        assert_eq!(to_strftime("YYYY/mm/DD").unwrap(), "%Y/%m/%d");
        assert_eq!(to_strftime("yyyy-mm-dd").unwrap(), "%Y-%m-%d");
    }

    #[test]
    fn test_natural_datetime_formatters() {
        assert_eq!(
            to_strftime("yyyy-mm-dd HH:MM:SS").unwrap(),
            "%Y-%m-%d %H:%M:%S"
        );
        assert_eq!(to_strftime("yyyymmddTHHMMss").unwrap(), "%Y%m%dT%H%M%S");
    }

    #[test]
    fn test_strptime_is_passed_through() {
        assert_eq!(to_strftime("%Y%m%d").unwrap(), "%Y%m%d");
    }

    #[test]
    fn test_invalid_formatters() {
        assert!(to_strftime("").is_err());
        let err = to_strftime("yyyy.mm.dd").unwrap_err();
        assert!(err.to_string().contains("'.'"));
    }

    #[test]
    fn test_parse_date_only_is_midnight() {
        let point = parse_point("20240131", "yyyymmdd").unwrap();
        assert_eq!((point.year(), point.month(), point.day()), (2024, 1, 31));
        assert_eq!(point.hour(), 0);
    }

    #[test]
    fn test_parse_datetime() {
        let point = parse_point("2024-01-31 13:45:10", "yyyy-mm-dd HH:MM:SS").unwrap();
        assert_eq!((point.hour(), point.minute(), point.second()), (13, 45, 10));
    }

    #[test]
    fn test_parse_mismatch() {
        let err = parse_point("2024/01/31", "yyyymmdd").unwrap_err();
        assert!(matches!(err, UrlError::DateParse { .. }));
    }
}
