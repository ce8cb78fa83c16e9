//! Status command for showing system state.

use console::style;

use crate::cli::helpers::open_repository;
use crate::config::Settings;

/// Show overall system status.
pub async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    println!("\n{}", style("naac-drive Status").bold());
    println!("{}", "-".repeat(40));
    println!("{:<20} {}", "Data Directory:", settings.data_dir.display());
    println!(
        "{:<20} {}{}",
        "Workbook:",
        settings.workbook_path.display(),
        if settings.workbook_path.exists() {
            String::new()
        } else {
            format!(" {}", style("(missing)").yellow())
        }
    );
    println!("{:<20} {}", "Folders:", settings.folders.len());
    println!("{:<20} {}", "NAAC Year:", settings.naac_year);

    if !settings.database_exists() {
        println!(
            "{} No database yet. Run 'naac scan' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    let repo = open_repository(settings)?;
    println!("{:<20} {}", "Classified Files:", repo.count_files()?);
    println!("{:<20} {}", "Exempt Files:", repo.count_exempt()?);
    if let Some((min, max)) = repo.year_bounds()? {
        println!("{:<20} {} to {}", "Years:", min, max);
    }

    match repo.latest_scan_run()? {
        Some(run) => {
            println!(
                "{:<20} {} ({} files, {} missing folders)",
                "Last Scan:",
                run.finished_at.format("%Y-%m-%d %H:%M"),
                run.total,
                run.missing_folders
            );
        }
        None => println!("{:<20} Never", "Last Scan:"),
    }

    Ok(())
}
