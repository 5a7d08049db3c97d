/// Sales ledger: the record of completed purchases
///
/// Append-only. A sale is written once at fulfillment and afterwards only
/// read, by the download guard.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};

use crate::models::{RecordOutcome, Sale};

pub const SALES_COLLECTION: &str = "sales";

/// MongoDB duplicate key error code
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SaleLedger: Send + Sync {
    /// Record a completed sale
    ///
    /// Idempotent per (asset_id, transaction_id): a second call for the same
    /// pair writes nothing and reports `AlreadyRecorded`.
    async fn record(&self, sale: &Sale) -> Result<RecordOutcome, LedgerError>;

    /// Look up the sale for an (asset, transaction) pair
    async fn find(&self, asset_id: &str, transaction_id: &str) -> Result<Option<Sale>, LedgerError>;
}

/// Ledger backed by the `sales` collection
pub struct MongoSaleLedger {
    collection: Collection<Sale>,
}

impl MongoSaleLedger {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Sale>(SALES_COLLECTION),
        }
    }

    /// Unique index that makes `record` write-once
    pub async fn ensure_indexes(&self) -> Result<(), LedgerError> {
        let index = IndexModel::builder()
            .keys(doc! { "asset_id": 1, "transaction_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("asset_transaction_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(index).await?;
        log::info!("Ensured unique index on {}(asset_id, transaction_id)", SALES_COLLECTION);
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl SaleLedger for MongoSaleLedger {
    async fn record(&self, sale: &Sale) -> Result<RecordOutcome, LedgerError> {
        match self.collection.insert_one(sale).await {
            Ok(_) => Ok(RecordOutcome::Recorded),
            Err(e) if is_duplicate_key(&e) => Ok(RecordOutcome::AlreadyRecorded),
            Err(e) => Err(e.into()),
        }
    }

    async fn find(&self, asset_id: &str, transaction_id: &str) -> Result<Option<Sale>, LedgerError> {
        let sale = self
            .collection
            .find_one(doc! { "asset_id": asset_id, "transaction_id": transaction_id })
            .await?;
        Ok(sale)
    }
}

/// In-memory ledger for tests and local runs
#[derive(Default)]
pub struct InMemorySaleLedger {
    sales: RwLock<HashMap<(String, String), Sale>>,
}

impl InMemorySaleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sales.read().map(|sales| sales.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> LedgerError {
    LedgerError::Unavailable("lock poisoned".to_string())
}

#[async_trait]
impl SaleLedger for InMemorySaleLedger {
    async fn record(&self, sale: &Sale) -> Result<RecordOutcome, LedgerError> {
        let mut sales = self.sales.write().map_err(poisoned)?;
        let key = (sale.asset_id.clone(), sale.transaction_id.clone());

        if sales.contains_key(&key) {
            return Ok(RecordOutcome::AlreadyRecorded);
        }

        sales.insert(key, sale.clone());
        Ok(RecordOutcome::Recorded)
    }

    async fn find(&self, asset_id: &str, transaction_id: &str) -> Result<Option<Sale>, LedgerError> {
        let sales = self.sales.read().map_err(poisoned)?;
        Ok(sales
            .get(&(asset_id.to_string(), transaction_id.to_string()))
            .cloned())
    }
}
