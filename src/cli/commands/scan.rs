//! Scan command.

use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::cli::helpers::{connect_drive, load_codes, open_repository, truncate};
use crate::config::Settings;
use crate::services::{ScanEvent, Scanner};

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {prefix:.bold} {wide_msg}";

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template(SPINNER_TEMPLATE) {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Scan the configured Drive folders.
pub async fn cmd_scan(settings: &Settings, folders: Vec<String>) -> anyhow::Result<()> {
    let folders = if folders.is_empty() {
        settings.folders.clone()
    } else {
        folders
    };
    if folders.is_empty() {
        println!(
            "{} No folders configured. Add 'folders' to your config or pass them as arguments.",
            style("!").yellow()
        );
        return Ok(());
    }

    let codes = load_codes(settings)?;
    let repo = open_repository(settings)?;
    let drive = connect_drive(settings).await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let pb = new_spinner();
    let render = {
        let pb = pb.clone();
        tokio::spawn(async move {
            let mut seen = 0u64;
            while let Some(event) = rx.recv().await {
                match event {
                    ScanEvent::FolderStarted { name } => {
                        seen = 0;
                        pb.set_prefix(truncate(&name, 30));
                    }
                    ScanEvent::FolderMissing { name } => {
                        pb.println(format!("{} Folder '{}' not found", style("!").yellow(), name));
                    }
                    ScanEvent::FileClassified { name, .. } | ScanEvent::FileExempt { name, .. } => {
                        seen += 1;
                        pb.set_message(format!("{} files · {}", seen, truncate(&name, 50)));
                    }
                    ScanEvent::FolderFinished { name, files } => {
                        pb.println(format!("{} {} ({} files)", style("✓").green(), name, files));
                    }
                }
            }
        })
    };

    let scanner = Scanner::new(Arc::new(drive), repo, codes).with_events(tx);
    let result = scanner.scan(&folders).await;
    // Dropping the scanner closes the channel so the renderer finishes
    drop(scanner);
    let _ = render.await;
    pb.finish_and_clear();

    let summary = result?;

    println!("\n{}", style("Scan Complete").bold());
    println!("{}", "-".repeat(40));
    println!("{:<20} {}", "Folders:", summary.folders);
    println!("{:<20} {}", "Classified:", summary.classified);
    println!("{:<20} {}", "Exempt:", summary.exempt);
    println!("{:<20} {}", "Total:", summary.total);
    if summary.missing_folders > 0 {
        println!(
            "{:<20} {}",
            "Missing folders:",
            style(summary.missing_folders).yellow()
        );
    }

    if !summary.exempt_entries.is_empty() {
        println!("\n{}", style("Exempt Files").bold());
        for entry in &summary.exempt_entries {
            println!(
                "  {:<50} {}",
                truncate(&entry.file_name, 49),
                style(&entry.folder_name).dim()
            );
        }
    }

    Ok(())
}
