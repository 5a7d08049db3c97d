/// Gatekeeper for purchased downloads
///
/// A request walks `Received -> ParameterCheck -> SignatureCheck ->
/// LedgerCheck -> Streaming -> Done`. Any failed check is terminal.
/// Cheap checks run first so garbage never reaches the ledger.

use std::sync::Arc;

use crate::models::{ImageAsset, Sale};
use crate::security::{split_path_and_query, unix_now, QueryParams, UrlSigner};

use super::catalog::{AssetCatalog, CatalogError};
use super::ledger::{LedgerError, SaleLedger};
use super::origin::{AssetBody, AssetOrigin, OriginError};

/// Signed query parameter naming the payment transaction
pub const TRANSACTION_PARAM: &str = "tx";

/// Route prefix of protected downloads
pub const DOWNLOAD_PATH_PREFIX: &str = "/api/download/";

/// Resource path signed for an asset
pub fn download_path(asset_id: &str) -> String {
    format!("{}{}", DOWNLOAD_PATH_PREFIX, asset_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStage {
    Received,
    ParameterCheck,
    SignatureCheck,
    LedgerCheck,
    Streaming,
    Done,
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Missing transaction id")]
    MissingTransaction,

    /// Covers missing, malformed, expired and forged links alike
    #[error("Invalid or expired download link")]
    InvalidLink,

    #[error("Unauthorized download")]
    NoMatchingPurchase,

    #[error("Asset not found")]
    AssetNotFound,

    #[error("ledger lookup failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("catalog lookup failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("asset fetch failed: {0}")]
    Origin(#[from] OriginError),
}

impl DownloadError {
    /// Stage the request was in when it failed
    pub fn stage(&self) -> DownloadStage {
        match self {
            DownloadError::MissingTransaction => DownloadStage::ParameterCheck,
            DownloadError::InvalidLink => DownloadStage::SignatureCheck,
            DownloadError::NoMatchingPurchase | DownloadError::Ledger(_) => DownloadStage::LedgerCheck,
            DownloadError::AssetNotFound
            | DownloadError::Catalog(_)
            | DownloadError::Origin(_) => DownloadStage::Streaming,
        }
    }

    /// Rejections the caller caused, as opposed to backend faults
    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            DownloadError::MissingTransaction
                | DownloadError::InvalidLink
                | DownloadError::NoMatchingPurchase
        )
    }
}

/// A download request as the server received it
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    /// Asset id routed from the path
    pub asset_id: &'a str,
    /// Raw path and query, byte-for-byte
    pub path_and_query: &'a str,
}

/// Everything needed to stream an authorized download
pub struct AssetDelivery {
    pub asset: ImageAsset,
    pub sale: Sale,
    pub body: AssetBody,
}

pub struct DownloadGuard {
    signer: Arc<UrlSigner>,
    ledger: Arc<dyn SaleLedger>,
    catalog: Arc<dyn AssetCatalog>,
    origin: Arc<dyn AssetOrigin>,
}

impl DownloadGuard {
    pub fn new(
        signer: Arc<UrlSigner>,
        ledger: Arc<dyn SaleLedger>,
        catalog: Arc<dyn AssetCatalog>,
        origin: Arc<dyn AssetOrigin>,
    ) -> Self {
        Self {
            signer,
            ledger,
            catalog,
            origin,
        }
    }

    pub async fn admit(&self, request: DownloadRequest<'_>) -> Result<AssetDelivery, DownloadError> {
        self.admit_at(request, unix_now()).await
    }

    pub async fn admit_at(
        &self,
        request: DownloadRequest<'_>,
        now: i64,
    ) -> Result<AssetDelivery, DownloadError> {
        trace_stage(DownloadStage::Received, request.asset_id);
        trace_stage(DownloadStage::ParameterCheck, request.asset_id);
        let (_, query) = split_path_and_query(request.path_and_query);
        let transaction_id = query
            .map(QueryParams::parse)
            .and_then(|params| params.get(TRANSACTION_PARAM).map(str::to_string))
            .filter(|tx| !tx.is_empty())
            .ok_or(DownloadError::MissingTransaction)?;

        trace_stage(DownloadStage::SignatureCheck, request.asset_id);
        if !self.signer.verify_at(request.path_and_query, now) {
            return Err(DownloadError::InvalidLink);
        }

        trace_stage(DownloadStage::LedgerCheck, request.asset_id);
        let sale = self
            .ledger
            .find(request.asset_id, &transaction_id)
            .await?
            .ok_or(DownloadError::NoMatchingPurchase)?;

        trace_stage(DownloadStage::Streaming, request.asset_id);
        let asset = self
            .catalog
            .find(request.asset_id)
            .await?
            .ok_or(DownloadError::AssetNotFound)?;

        let body = self.origin.open(&asset).await?;

        Ok(AssetDelivery { asset, sale, body })
    }
}

pub(crate) fn trace_stage(stage: DownloadStage, asset_id: &str) {
    log::debug!("Download {:?}: asset {}", stage, asset_id);
}
