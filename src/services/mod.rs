pub mod catalog;
pub mod download_guard;
pub mod ledger;
pub mod origin;

pub use catalog::{AssetCatalog, CatalogError, InMemoryCatalog, MongoCatalog};
pub use download_guard::{
    download_path, AssetDelivery, DownloadError, DownloadGuard, DownloadRequest, DownloadStage,
    TRANSACTION_PARAM,
};
pub use ledger::{InMemorySaleLedger, LedgerError, MongoSaleLedger, SaleLedger};
pub use origin::{
    AssetBody, AssetOrigin, HttpOrigin, InMemoryOrigin, LocalOrigin, OriginError, StorageOrigin,
};
