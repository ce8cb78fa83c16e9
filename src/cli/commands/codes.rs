//! Classification workbook commands.

use std::collections::BTreeMap;

use anyhow::Context;
use console::style;
use tempfile::NamedTempFile;

use crate::cli::helpers::{connect_drive, load_codes, truncate};
use crate::config::Settings;
use crate::drive::{DriveSource, XLSX_MIME_TYPE};

/// Download the classification spreadsheet as an xlsx workbook.
pub async fn cmd_fetch_sheet(settings: &Settings) -> anyhow::Result<()> {
    let Some(sheet_id) = settings.sheet_id.as_deref() else {
        println!(
            "{} No sheet_id configured. Add it to your naac-drive config file.",
            style("!").yellow()
        );
        return Ok(());
    };

    let drive = connect_drive(settings).await?;
    let bytes = drive.export_file(sheet_id, XLSX_MIME_TYPE).await?;

    settings.ensure_directories()?;
    let dir = settings
        .workbook_path
        .parent()
        .unwrap_or(settings.data_dir.as_path())
        .to_path_buf();
    std::fs::create_dir_all(&dir)?;
    let mut tmp = NamedTempFile::new_in(&dir)?;
    std::io::Write::write_all(&mut tmp, &bytes)?;
    tmp.persist(&settings.workbook_path)
        .with_context(|| format!("Failed to write {}", settings.workbook_path.display()))?;

    println!(
        "{} Saved workbook ({} bytes) to {}",
        style("✓").green(),
        bytes.len(),
        settings.workbook_path.display()
    );

    cmd_codes(settings).await
}

/// Load the workbook, write the JSON code lists and summarize them.
pub async fn cmd_codes(settings: &Settings) -> anyhow::Result<()> {
    let codes = load_codes(settings)?;

    let mut per_category: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for (code, entry) in &codes.codes {
        per_category
            .entry(entry.category.as_str())
            .or_default()
            .push((code.as_str(), entry.name.as_str()));
    }

    println!("\n{}", style("Document Codes").bold());
    println!("{}", "-".repeat(60));
    for (category, entries) in &per_category {
        println!("{} ({})", style(category).cyan(), entries.len());
        for (code, name) in entries {
            println!("  {:<8} {}", code, truncate(name, 50));
        }
    }
    println!("{}", "-".repeat(60));
    println!(
        "{} {} codes, {} classifications written to {}",
        style("✓").green(),
        codes.codes.len(),
        codes.classifications.len(),
        settings.data_dir.display()
    );

    Ok(())
}
