//! Binary entry point: initializes logging, configuration, and the database,
//! then reports a stock overview so operators can see the ledger state at
//! startup.

use catalog_buddy::{
    config::{self, database},
    core::inventory,
    errors::Result,
};
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Non-fatal: env vars can be set externally
    dotenv().ok();

    let settings = config::settings::load_default_settings()?;

    let db = database::create_connection().await?;
    database::create_tables(&db).await?;
    info!("Database initialized successfully.");

    let overview = inventory::stock_overview(&db, settings.low_stock_threshold).await?;
    info!(
        "Catalog ready: {} active variants, {} low stock, {} out of stock",
        overview.total_active, overview.low_stock, overview.out_of_stock
    );

    Ok(())
}
