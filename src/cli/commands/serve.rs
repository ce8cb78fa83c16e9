//! Serve command.

use std::net::SocketAddr;
use std::sync::Arc;

use console::style;

use crate::cli::helpers::{connect_drive, load_codes, open_repository};
use crate::config::Settings;
use crate::drive::DriveSource;
use crate::server::{serve, AppState};

/// Start the HTTP API.
pub async fn cmd_serve(settings: &Settings, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let codes = load_codes(settings)?;
    let repo = open_repository(settings)?;

    // Reads work without Drive access; only scans need it
    let drive: Option<Arc<dyn DriveSource>> = match connect_drive(settings).await {
        Ok(drive) => Some(Arc::new(drive)),
        Err(e) => {
            tracing::warn!("Scans disabled: {:#}", e);
            None
        }
    };

    let bind = bind.unwrap_or(settings.bind);
    println!(
        "{} Serving naac-drive API on http://{}",
        style("→").cyan(),
        bind
    );

    let state = AppState::new(
        repo,
        codes,
        drive,
        settings.folders.clone(),
        settings.naac_year,
    );
    serve(state, bind, &settings.cors_origins).await?;
    Ok(())
}
