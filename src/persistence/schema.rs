//! Database schema for the SQLite sink

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Rows produced by the data handler, stored as JSON
CREATE TABLE IF NOT EXISTS crawl_rows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    destination TEXT NOT NULL,
    row_index INTEGER NOT NULL,
    data TEXT NOT NULL,
    saved_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_rows_run ON crawl_rows(run_id);
CREATE INDEX IF NOT EXISTS idx_crawl_rows_destination ON crawl_rows(destination);
"#;

/// Bumped whenever `SCHEMA_SQL` changes shape
pub const SCHEMA_VERSION: u32 = 1;

/// Creates the tables if they do not exist yet
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
