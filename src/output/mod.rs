//! Output module for crawl reports
//!
//! This module handles:
//! - Loading run and row statistics from the crawl database
//! - Printing them for the `--stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, render_statistics, CrawlStatistics};
