//! SQLite persistence for classified files, exempt files, folders and scan runs.
//!
//! All records are keyed by their Drive id and written with upserts, so
//! re-running a scan over unchanged folders leaves record counts unchanged.

mod files;
mod folders;
mod scans;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::error::{Error, Result};

/// SQLite-backed repository shared by the scanner, reports and the server.
pub struct Repository {
    conn: Mutex<Connection>,
}

impl Repository {
    /// Open (creating if needed) the database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;

        // WAL lets the API read while a scan writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        debug!("Opened database {}", db_path.display());
        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Other("database connection lock poisoned".to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            -- Files whose names matched the naming convention
            CREATE TABLE IF NOT EXISTS files (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                parent_folder_id TEXT NOT NULL,
                year TEXT NOT NULL,
                year_start INTEGER NOT NULL,
                code TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Files that could not be classified
            CREATE TABLE IF NOT EXISTS exempt_files (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                parent_folder_id TEXT NOT NULL,
                reason TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Configured top-level folders
            CREATE TABLE IF NOT EXISTS folders (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                web_view_link TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- One row per scan invocation
            CREATE TABLE IF NOT EXISTS scan_runs (
                id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                folders INTEGER NOT NULL,
                classified INTEGER NOT NULL,
                exempt INTEGER NOT NULL,
                total INTEGER NOT NULL,
                missing_folders INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_files_code_year ON files(code, year_start);
            CREATE INDEX IF NOT EXISTS idx_files_year ON files(year_start);
            CREATE INDEX IF NOT EXISTS idx_scan_runs_started ON scan_runs(started_at);
        "#,
        )?;
        Ok(())
    }
}

pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
