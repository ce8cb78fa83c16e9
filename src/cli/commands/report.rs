//! Report commands.

use std::path::PathBuf;

use console::style;

use crate::cli::helpers::{load_codes, open_repository, truncate};
use crate::config::Settings;
use crate::models::AcademicYear;
use crate::services::{build_report, export_report, naac_report};

/// Rebuild counts from the database and export them as JSON.
pub async fn cmd_report(settings: &Settings, out: Option<PathBuf>) -> anyhow::Result<()> {
    let codes = load_codes(settings)?;
    let repo = open_repository(settings)?;

    let report = build_report(&repo, &codes)?;
    let naac = naac_report(&report, &codes, settings.naac_year);
    let out = out.unwrap_or_else(|| settings.data_dir.clone());
    export_report(&report, &naac, &out)?;

    println!("\n{}", style("Document Counts").bold());
    println!("{}", "-".repeat(60));
    for category in report.counts.categories() {
        let years = report.counts.years(category);
        if years.is_empty() {
            println!("{} {}", style(category).cyan(), style("(none)").dim());
            continue;
        }
        println!("{}", style(category).cyan());
        for year in years {
            let codes: Vec<String> = report
                .counts
                .codes(category, year)
                .into_iter()
                .map(|(code, n)| format!("{}={}", code, n))
                .collect();
            println!("  {:<10} {}", year, codes.join(" "));
        }
    }
    println!("{}", "-".repeat(60));
    println!(
        "{} {} classified, {} exempt; wrote data.json, exempt.json, naac.json to {}",
        style("✓").green(),
        report.counts.total(),
        report.exempt.len(),
        out.display()
    );

    Ok(())
}

/// Print the NAAC rollup for one academic year.
pub async fn cmd_naac(settings: &Settings, year: Option<AcademicYear>) -> anyhow::Result<()> {
    let codes = load_codes(settings)?;
    let repo = open_repository(settings)?;
    let year = year.unwrap_or(settings.naac_year);

    let report = build_report(&repo, &codes)?;
    let naac = naac_report(&report, &codes, year);

    println!("\n{} {}", style("NAAC Counts").bold(), year);
    println!("{}", "-".repeat(50));
    println!("{:<25} {:<15} Count", "Category", "Classification");
    println!("{}", "-".repeat(50));
    for row in &naac.rows {
        let count = if row.count > 0 {
            style(row.count).green()
        } else {
            style(row.count).dim()
        };
        println!(
            "{:<25} {:<15} {}",
            truncate(&row.category, 24),
            row.classification,
            count
        );
    }

    Ok(())
}
