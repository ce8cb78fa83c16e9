//! Command line interface.

mod commands;
pub mod helpers;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};
use crate::models::AcademicYear;

#[derive(Debug, Parser)]
#[command(name = "naac", version, about = "Classify NAAC accreditation documents in Google Drive")]
pub struct Cli {
    /// Config file (JSON or TOML); discovered automatically when omitted
    #[arg(long, global = true, env = "NAAC_DRIVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory for the database, workbook and exports
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Resolve relative config paths against the current directory
    #[arg(long, global = true)]
    pub cwd: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download the classification spreadsheet from Drive
    FetchSheet,
    /// Load the classification workbook and write the JSON code lists
    Codes,
    /// Scan Drive folders and classify their files
    Scan {
        /// Folder names to scan instead of the configured ones
        folders: Vec<String>,
    },
    /// Export aggregated counts as JSON
    Report {
        /// Output directory (defaults to the data directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show the NAAC rollup for one academic year
    Naac {
        /// Academic year, e.g. 2022-2023
        #[arg(long)]
        year: Option<AcademicYear>,
    },
    /// Run the HTTP API
    Serve {
        /// Address to bind, e.g. 127.0.0.1:8000
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Show database and configuration status
    Status,
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_settings_with_options(LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        data_dir: cli.data_dir,
    })
    .await;

    match cli.command {
        Commands::FetchSheet => commands::cmd_fetch_sheet(&settings).await,
        Commands::Codes => commands::cmd_codes(&settings).await,
        Commands::Scan { folders } => commands::cmd_scan(&settings, folders).await,
        Commands::Report { out } => commands::cmd_report(&settings, out).await,
        Commands::Naac { year } => commands::cmd_naac(&settings, year).await,
        Commands::Serve { bind } => commands::cmd_serve(&settings, bind).await,
        Commands::Status => commands::cmd_status(&settings).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["naac", "naac", "--year", "2021-2022", "--data-dir", "/tmp/n"])
            .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/n")));
        match cli.command {
            Commands::Naac { year } => assert_eq!(year, Some(AcademicYear::new(2021))),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_invalid_year_is_rejected() {
        assert!(Cli::try_parse_from(["naac", "naac", "--year", "2021"]).is_err());
    }
}
