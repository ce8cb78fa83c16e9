//! Scan run bookkeeping.

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Repository};
use crate::error::Result;
use crate::models::ScanRun;

impl Repository {
    pub fn record_scan_run(&self, run: &ScanRun) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"INSERT INTO scan_runs (id, started_at, finished_at, folders, classified, exempt, total, missing_folders)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                run.id,
                run.started_at.to_rfc3339(),
                run.finished_at.to_rfc3339(),
                run.folders as i64,
                run.classified as i64,
                run.exempt as i64,
                run.total as i64,
                run.missing_folders as i64,
            ],
        )?;
        Ok(())
    }

    /// Most recently started scan, if any.
    pub fn latest_scan_run(&self) -> Result<Option<ScanRun>> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                r#"SELECT id, started_at, finished_at, folders, classified, exempt, total, missing_folders
                   FROM scan_runs ORDER BY started_at DESC LIMIT 1"#,
                [],
                |row| {
                    let started_at: String = row.get(1)?;
                    let finished_at: String = row.get(2)?;
                    Ok(ScanRun {
                        id: row.get(0)?,
                        started_at: parse_datetime(&started_at),
                        finished_at: parse_datetime(&finished_at),
                        folders: row.get::<_, i64>(3)? as u64,
                        classified: row.get::<_, i64>(4)? as u64,
                        exempt: row.get::<_, i64>(5)? as u64,
                        total: row.get::<_, i64>(6)? as u64,
                        missing_folders: row.get::<_, i64>(7)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(run)
    }
}
