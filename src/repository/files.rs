//! Classified and exempt file records.
//!
//! A Drive file is in exactly one of the two tables: writing it to one
//! removes it from the other in the same transaction.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::Repository;
use crate::error::Result;
use crate::models::{AcademicYear, ClassifiedFile, ExemptFile};

const FILE_COLUMNS: &str = "id, name, mime_type, parent_folder_id, year_start, code";
const EXEMPT_COLUMNS: &str = "id, name, mime_type, parent_folder_id, reason";

fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<ClassifiedFile> {
    Ok(ClassifiedFile {
        id: row.get(0)?,
        name: row.get(1)?,
        mime_type: row.get(2)?,
        parent_folder_id: row.get(3)?,
        year: AcademicYear::new(row.get(4)?),
        code: row.get(5)?,
    })
}

fn row_to_exempt(row: &rusqlite::Row) -> rusqlite::Result<ExemptFile> {
    Ok(ExemptFile {
        id: row.get(0)?,
        name: row.get(1)?,
        mime_type: row.get(2)?,
        parent_folder_id: row.get(3)?,
        reason: row.get(4)?,
    })
}

impl Repository {
    /// Insert or update a classified file.
    pub fn upsert_file(&self, file: &ClassifiedFile) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"INSERT INTO files (id, name, mime_type, parent_folder_id, year, year_start, code, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
               ON CONFLICT(id) DO UPDATE SET
                   name = excluded.name,
                   mime_type = excluded.mime_type,
                   parent_folder_id = excluded.parent_folder_id,
                   year = excluded.year,
                   year_start = excluded.year_start,
                   code = excluded.code,
                   updated_at = excluded.updated_at"#,
            params![
                file.id,
                file.name,
                file.mime_type,
                file.parent_folder_id,
                file.year.label(),
                file.year.start,
                file.code,
                Utc::now().to_rfc3339(),
            ],
        )?;
        tx.execute("DELETE FROM exempt_files WHERE id = ?1", params![file.id])?;
        tx.commit()?;
        Ok(())
    }

    /// Insert or update an exempt file.
    pub fn upsert_exempt(&self, file: &ExemptFile) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"INSERT INTO exempt_files (id, name, mime_type, parent_folder_id, reason, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               ON CONFLICT(id) DO UPDATE SET
                   name = excluded.name,
                   mime_type = excluded.mime_type,
                   parent_folder_id = excluded.parent_folder_id,
                   reason = excluded.reason,
                   updated_at = excluded.updated_at"#,
            params![
                file.id,
                file.name,
                file.mime_type,
                file.parent_folder_id,
                file.reason,
                Utc::now().to_rfc3339(),
            ],
        )?;
        tx.execute("DELETE FROM files WHERE id = ?1", params![file.id])?;
        tx.commit()?;
        Ok(())
    }

    /// Get a classified file by Drive id.
    pub fn get_file(&self, id: &str) -> Result<Option<ClassifiedFile>> {
        let conn = self.conn()?;
        let file = conn
            .query_row(
                &format!("SELECT {} FROM files WHERE id = ?1", FILE_COLUMNS),
                params![id],
                row_to_file,
            )
            .optional()?;
        Ok(file)
    }

    /// All classified files, newest academic year first.
    pub fn list_files(&self) -> Result<Vec<ClassifiedFile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM files ORDER BY year_start DESC, code, name",
            FILE_COLUMNS
        ))?;
        let files = stmt
            .query_map([], row_to_file)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Classified files for one code.
    pub fn list_files_by_code(&self, code: &str) -> Result<Vec<ClassifiedFile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM files WHERE code = ?1 ORDER BY year_start DESC, name",
            FILE_COLUMNS
        ))?;
        let files = stmt
            .query_map(params![code], row_to_file)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Classified files whose academic year starts within `[start, end]`,
    /// optionally restricted to one code.
    pub fn query_files(
        &self,
        code: Option<&str>,
        start: i32,
        end: i32,
    ) -> Result<Vec<ClassifiedFile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"SELECT {} FROM files
               WHERE (?1 IS NULL OR code = ?1)
                 AND year_start BETWEEN ?2 AND ?3
               ORDER BY year_start DESC, code, name"#,
            FILE_COLUMNS
        ))?;
        let files = stmt
            .query_map(params![code, start, end], row_to_file)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// All exempt files in the order they were first recorded.
    ///
    /// Upserts keep the row id of an existing record, so a rescan leaves
    /// the order of the first scan in place.
    pub fn list_exempt(&self) -> Result<Vec<ExemptFile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM exempt_files ORDER BY rowid",
            EXEMPT_COLUMNS
        ))?;
        let files = stmt
            .query_map([], row_to_exempt)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    pub fn count_files(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_exempt(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM exempt_files", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Earliest and latest academic-year start over stored files.
    pub fn year_bounds(&self) -> Result<Option<(i32, i32)>> {
        let conn = self.conn()?;
        let (min, max): (Option<i32>, Option<i32>) = conn.query_row(
            "SELECT MIN(year_start), MAX(year_start) FROM files",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(min.zip(max))
    }
}
