//! Shared helper functions for CLI commands.

use std::sync::Arc;

use anyhow::Context;

use crate::codes::CodeList;
use crate::config::Settings;
use crate::drive::GoogleDrive;
use crate::repository::Repository;

/// Truncate a string to `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

/// Open the configured database, creating the data directory first.
pub fn open_repository(settings: &Settings) -> anyhow::Result<Arc<Repository>> {
    settings.ensure_directories()?;
    let path = settings.database_path();
    let repo = Repository::open(&path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(Arc::new(repo))
}

/// Load the code list from the configured workbook and refresh its JSON exports.
pub fn load_codes(settings: &Settings) -> anyhow::Result<Arc<CodeList>> {
    let codes = CodeList::load(&settings.workbook_path, &settings.primary_sheet)?;
    settings.ensure_directories()?;
    codes.write_json(&settings.data_dir)?;
    Ok(Arc::new(codes))
}

/// Connect to Drive using the configured credentials.
pub async fn connect_drive(settings: &Settings) -> anyhow::Result<GoogleDrive> {
    GoogleDrive::connect(settings)
        .await
        .context("Failed to authenticate with Google Drive")
}
