use mongodb::{Client, Database};

use crate::config::Config;
use crate::services::{CatalogError, LedgerError, MongoCatalog, MongoSaleLedger};

pub async fn init_db(config: &Config) -> Result<Database, mongodb::error::Error> {
    let client = Client::with_uri_str(&config.mongodb_uri).await?;

    // Ping the database to verify connection
    client
        .database("admin")
        .run_command(mongodb::bson::doc! {"ping": 1})
        .await?;

    log::info!("Successfully connected to MongoDB");

    Ok(client.database(&config.database_name))
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Indexes the core relies on: write-once sales and unique asset ids
pub async fn ensure_indexes(
    ledger: &MongoSaleLedger,
    catalog: &MongoCatalog,
) -> Result<(), IndexError> {
    ledger.ensure_indexes().await?;
    catalog.ensure_indexes().await?;
    Ok(())
}
