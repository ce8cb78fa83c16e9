//! Folder records.

use chrono::Utc;
use rusqlite::params;

use super::Repository;
use crate::error::Result;
use crate::models::FolderRecord;

impl Repository {
    /// Insert or update a folder record.
    pub fn upsert_folder(&self, folder: &FolderRecord) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"INSERT INTO folders (id, name, web_view_link, updated_at)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(id) DO UPDATE SET
                   name = excluded.name,
                   web_view_link = excluded.web_view_link,
                   updated_at = excluded.updated_at"#,
            params![
                folder.id,
                folder.name,
                folder.web_view_link,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn list_folders(&self) -> Result<Vec<FolderRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, web_view_link FROM folders ORDER BY name")?;
        let folders = stmt
            .query_map([], |row| {
                Ok(FolderRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    web_view_link: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(folders)
    }
}
