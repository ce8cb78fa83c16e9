use naac_drive::{cli, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    logging::init_logging();

    cli::run().await
}
