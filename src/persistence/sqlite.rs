//! SQLite sink
//!
//! Rows are serialized to JSON and stored in `crawl_rows`, tagged with the
//! active crawl run and a destination name (the logical table the rows
//! belong to). One `save` call is one transaction: either every row of
//! the batch is stored or none is.

use super::schema::initialize_schema;
use super::traits::PersistenceSink;
use super::{RunRecord, RunStatus};
use crate::{PersistenceError, PersistenceResult, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

struct State {
    conn: Connection,
    run_id: Option<i64>,
}

/// SQLite persistence backend
pub struct SqliteSink {
    state: Mutex<State>,
    destination: String,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `destination` - Name recorded with every saved row
    pub fn open(path: &Path, destination: impl Into<String>) -> PersistenceResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Self::with_connection(conn, destination)
    }

    /// Creates an in-memory database
    pub fn new_in_memory(destination: impl Into<String>) -> PersistenceResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::with_connection(conn, destination)
    }

    fn with_connection(conn: Connection, destination: impl Into<String>) -> PersistenceResult<Self> {
        initialize_schema(&conn)?;
        Ok(Self {
            state: Mutex::new(State { conn, run_id: None }),
            destination: destination.into(),
        })
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| PersistenceError::Poisoned)
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The run rows are currently saved under
    pub fn active_run(&self) -> Option<i64> {
        self.lock().ok().and_then(|state| state.run_id)
    }

    // ===== Run Management =====

    /// Starts a crawl run; subsequent saves are tagged with it
    pub fn begin_run(&self, config_hash: &str) -> PersistenceResult<i64> {
        let mut state = self.lock()?;
        let now = Utc::now().to_rfc3339();
        state.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        let run_id = state.conn.last_insert_rowid();
        state.run_id = Some(run_id);

        tracing::info!("Started crawl run {}", run_id);
        Ok(run_id)
    }

    /// Marks the active run completed
    pub fn complete_run(&self) -> PersistenceResult<()> {
        self.finish_run(RunStatus::Completed)
    }

    /// Marks the active run failed
    pub fn fail_run(&self) -> PersistenceResult<()> {
        self.finish_run(RunStatus::Failed)
    }

    fn finish_run(&self, status: RunStatus) -> PersistenceResult<()> {
        let mut state = self.lock()?;
        let run_id = state.run_id.take().ok_or(PersistenceError::NoActiveRun)?;
        let now = Utc::now().to_rfc3339();
        state.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        tracing::info!("Crawl run {} finished as {}", run_id, status.to_db_string());
        Ok(())
    }

    pub fn get_run(&self, run_id: i64) -> PersistenceResult<RunRecord> {
        let state = self.lock()?;
        state
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(PersistenceError::RunNotFound(run_id))
    }

    pub fn get_latest_run(&self) -> PersistenceResult<Option<RunRecord>> {
        let state = self.lock()?;
        let run = state
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    /// Number of runs per status
    pub fn count_runs_by_status(&self, status: RunStatus) -> PersistenceResult<u64> {
        let state = self.lock()?;
        let count: i64 = state.conn.query_row(
            "SELECT COUNT(*) FROM runs WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Row Queries =====

    pub fn count_rows(&self, run_id: i64) -> PersistenceResult<u64> {
        let state = self.lock()?;
        let count: i64 = state.conn.query_row(
            "SELECT COUNT(*) FROM crawl_rows WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Stored row counts per destination, across every run
    pub fn rows_by_destination(&self) -> PersistenceResult<Vec<(String, u64)>> {
        let state = self.lock()?;
        let mut stmt = state.conn.prepare(
            "SELECT destination, COUNT(*) FROM crawl_rows GROUP BY destination ORDER BY destination",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(counts)
    }

    /// Loads the rows saved for this sink's destination in `run_id`
    pub fn load_rows<T: DeserializeOwned>(&self, run_id: i64) -> PersistenceResult<Vec<T>> {
        let state = self.lock()?;
        let mut stmt = state.conn.prepare(
            "SELECT data FROM crawl_rows WHERE run_id = ?1 AND destination = ?2 ORDER BY id",
        )?;

        let raw = stmt
            .query_map(params![run_id, self.destination], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.iter()
            .map(|data| serde_json::from_str(data).map_err(PersistenceError::from))
            .collect()
    }

    fn insert_rows<T: Serialize>(&self, data: &[T]) -> PersistenceResult<usize> {
        let mut state = self.lock()?;
        let run_id = state.run_id.ok_or(PersistenceError::NoActiveRun)?;

        let encoded = data
            .iter()
            .map(serde_json::to_string)
            .collect::<serde_json::Result<Vec<_>>>()?;

        let now = Utc::now().to_rfc3339();
        let tx = state.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO crawl_rows (run_id, destination, row_index, data, saved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let offset: i64 = tx.query_row(
                "SELECT COUNT(*) FROM crawl_rows WHERE run_id = ?1 AND destination = ?2",
                params![run_id, self.destination],
                |row| row.get(0),
            )?;

            for (index, row) in encoded.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    self.destination,
                    offset + index as i64,
                    row,
                    now
                ])?;
            }
        }
        tx.commit()?;

        Ok(encoded.len())
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
    })
}

impl<T: Serialize + Sync> PersistenceSink<T> for SqliteSink {
    fn save(&self, data: &[T]) -> Result<()> {
        let saved = self.insert_rows(data)?;
        tracing::debug!("Saved {} rows to '{}'", saved, self.destination);
        Ok(())
    }
}
