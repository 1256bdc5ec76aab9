//! Statistics from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! run and row statistics from the SQLite sink.

use crate::persistence::{RunRecord, RunStatus, SqliteSink};
use crate::PersistenceResult;
use std::collections::HashMap;
use std::fmt::Write;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Count of runs by status
    pub runs_by_status: HashMap<RunStatus, u64>,

    /// Stored rows per destination, sorted by name
    pub rows_by_destination: Vec<(String, u64)>,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

impl CrawlStatistics {
    pub fn total_runs(&self) -> u64 {
        self.runs_by_status.values().sum()
    }

    pub fn total_rows(&self) -> u64 {
        self.rows_by_destination.iter().map(|(_, count)| count).sum()
    }
}

/// Loads statistics from the sink's database
pub fn load_statistics(sink: &SqliteSink) -> PersistenceResult<CrawlStatistics> {
    let mut runs_by_status = HashMap::new();
    for status in RunStatus::ALL {
        let count = sink.count_runs_by_status(status)?;
        if count > 0 {
            runs_by_status.insert(status, count);
        }
    }

    Ok(CrawlStatistics {
        runs_by_status,
        rows_by_destination: sink.rows_by_destination()?,
        latest_run: sink.get_latest_run()?,
    })
}

/// Formats statistics as the report printed by `--stats`
pub fn render_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Crawl Statistics ===\n");

    let _ = writeln!(out, "Runs ({} total):", stats.total_runs());
    for status in RunStatus::ALL {
        let count = stats.runs_by_status.get(&status).copied().unwrap_or(0);
        let _ = writeln!(out, "  {}: {}", status.to_db_string(), count);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Rows by Destination ({} total):", stats.total_rows());
    if stats.rows_by_destination.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (destination, count) in &stats.rows_by_destination {
        let _ = writeln!(out, "  {}: {}", destination, count);
    }
    let _ = writeln!(out);

    if let Some(run) = &stats.latest_run {
        let _ = writeln!(out, "Latest Run:");
        let _ = writeln!(out, "  id: {}", run.id);
        let _ = writeln!(out, "  status: {}", run.status.to_db_string());
        let _ = writeln!(out, "  started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            let _ = writeln!(out, "  finished: {}", finished);
        }
        let _ = writeln!(out, "  config hash: {}", run.config_hash);
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", render_statistics(stats));
}
