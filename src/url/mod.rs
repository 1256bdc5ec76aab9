//! URL generation
//!
//! A URL template carries exactly one placeholder naming the rule used to
//! expand it into concrete URLs:
//!
//! | Placeholder  | Values                                                  |
//! |--------------|---------------------------------------------------------|
//! | `{index}`    | every integer from `start` to `end` inclusive           |
//! | `{date}`     | `YYYYMMDD` dates from `start` to `end`, stepping days    |
//! | `{datetime}` | `YYYYMMDDHHMMSS` timestamps, stepping the full period    |
//! | `{iterator}` | each element of a sequence, or `key=value` per mapping entry |
//!
//! # Example
//!
//! ```
//! use sumi_crawler::url::UrlGenerator;
//!
//! let urls = UrlGenerator::new("https://example.com/page/{index}")
//!     .unwrap()
//!     .with_range(1, 3)
//!     .generate()
//!     .unwrap();
//!
//! assert_eq!(urls.len(), 3);
//! assert_eq!(urls[0], "https://example.com/page/1");
//! ```

mod formatter;
mod generator;
mod template;

use std::fmt;

pub use formatter::{parse_point, to_strftime};
pub use generator::{IteratorValues, Period, UrlGenerator, Urls, DEFAULT_FORMATTER};
pub use template::UrlTemplate;

/// The rule a template's placeholder selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Index,
    Date,
    Datetime,
    Iterator,
}

impl Placeholder {
    pub const ALL: [Placeholder; 4] = [
        Placeholder::Index,
        Placeholder::Date,
        Placeholder::Datetime,
        Placeholder::Iterator,
    ];

    /// Rule name as used in configuration and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Iterator => "iterator",
        }
    }

    /// The literal text replaced in the template, e.g. `{date}`
    pub fn token(&self) -> &'static str {
        match self {
            Self::Index => "{index}",
            Self::Date => "{date}",
            Self::Datetime => "{datetime}",
            Self::Iterator => "{iterator}",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
