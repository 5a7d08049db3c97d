use std::sync::Arc;

use crate::config::Config;
use crate::security::{SecretKey, UrlSigner};
use crate::services::{AssetCatalog, AssetOrigin, DownloadGuard, SaleLedger};

/// Shared application state, cloned into every worker
#[derive(Clone)]
pub struct AppState {
    pub signer: Arc<UrlSigner>,
    pub webhook_secret: SecretKey,
    pub ledger: Arc<dyn SaleLedger>,
    pub catalog: Arc<dyn AssetCatalog>,
    pub guard: Arc<DownloadGuard>,
    pub link_ttl_secs: u64,
    pub public_base_url: Option<String>,
}

impl AppState {
    pub fn new(
        config: &Config,
        ledger: Arc<dyn SaleLedger>,
        catalog: Arc<dyn AssetCatalog>,
        origin: Arc<dyn AssetOrigin>,
    ) -> Self {
        let signer = Arc::new(UrlSigner::new(config.signing_secret.clone()));
        let guard = Arc::new(DownloadGuard::new(
            signer.clone(),
            ledger.clone(),
            catalog.clone(),
            origin,
        ));

        Self {
            signer,
            webhook_secret: config.webhook_secret.clone(),
            ledger,
            catalog,
            guard,
            link_ttl_secs: config.link_ttl_secs,
            public_base_url: config.public_base_url.clone(),
        }
    }

    /// Absolute link when a public base URL is configured
    pub fn public_url(&self, path_and_query: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}{}", base, path_and_query),
            None => path_and_query.to_string(),
        }
    }
}
