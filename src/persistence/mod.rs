//! Persistence sinks for crawl results
//!
//! This module handles storing the final rows of a crawl:
//! - The [`PersistenceSink`] trait every backend implements
//! - [`FlattenSink`], storing each row of a per-URL table separately
//! - An in-memory sink for tests and dry runs
//! - A SQLite sink that tags rows with a crawl run and a destination
//! - Run tracking (started, completed, failed)

mod flatten;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use flatten::FlattenSink;
pub use memory::MemorySink;
pub use schema::{initialize_schema, SCHEMA_VERSION};
pub use sqlite::SqliteSink;
pub use traits::PersistenceSink;

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub const ALL: [RunStatus; 3] = [RunStatus::Running, RunStatus::Completed, RunStatus::Failed];

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in RunStatus::ALL {
            let db_str = status.to_db_string();
            assert_eq!(RunStatus::from_db_string(db_str), Some(status));
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("interrupted"), None);
    }
}
