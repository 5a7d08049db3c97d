// Common test utilities for server integration tests

use std::sync::Arc;

use chrono::Utc;
use storefront::config::Config;
use storefront::models::ImageAsset;
use storefront::security::create_signature;
use storefront::services::{InMemoryCatalog, InMemoryOrigin, InMemorySaleLedger};
use storefront::state::AppState;

pub const SIGNING_SECRET: &str = "integration-link-secret";
pub const WEBHOOK_SECRET: &str = "integration-hook-secret";
pub const IMAGE_BYTES: &[u8] = b"\xff\xd8\xff\xe0 pretend jpeg";

/// In-memory collaborators plus the state built from them
pub struct TestStore {
    pub ledger: Arc<InMemorySaleLedger>,
    pub catalog: Arc<InMemoryCatalog>,
    pub origin: Arc<InMemoryOrigin>,
    pub state: AppState,
}

pub fn test_config(public_base_url: Option<&str>) -> Config {
    let base = public_base_url.map(str::to_string);
    Config::from_lookup(move |name| match name {
        "DOWNLOAD_SIGNING_SECRET" => Some(SIGNING_SECRET.to_string()),
        "FULFILLMENT_WEBHOOK_SECRET" => Some(WEBHOOK_SECRET.to_string()),
        "PUBLIC_BASE_URL" => base.clone(),
        _ => None,
    })
    .expect("test config")
}

pub fn image(asset_id: &str, title: &str) -> ImageAsset {
    ImageAsset {
        id: None,
        asset_id: asset_id.to_string(),
        title: title.to_string(),
        description: Some("Test image".to_string()),
        price_cents: 1200,
        currency: "usd".to_string(),
        storage_location: format!("mem://originals/{}.jpg", asset_id),
        content_type: "image/jpeg".to_string(),
        file_name: format!("{}.jpg", title.to_lowercase().replace(' ', "_")),
        created_at: Utc::now(),
    }
}

/// Store with asset "42" listed and its bytes available at the origin
pub fn test_store(public_base_url: Option<&str>) -> TestStore {
    let ledger = Arc::new(InMemorySaleLedger::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let origin = Arc::new(InMemoryOrigin::new());

    let asset = image("42", "Harbour at Dusk");
    origin.insert(asset.storage_location.clone(), IMAGE_BYTES.to_vec());
    catalog.insert(asset);

    let state = AppState::new(
        &test_config(public_base_url),
        ledger.clone(),
        catalog.clone(),
        origin.clone(),
    );

    TestStore {
        ledger,
        catalog,
        origin,
        state,
    }
}

/// Headers a payment provider would attach to a fulfillment callback
pub fn callback_headers(body: &str, timestamp: i64) -> [(&'static str, String); 2] {
    let payload = format!("{}.{}", timestamp, body);
    let signature = create_signature(payload.as_bytes(), WEBHOOK_SECRET.as_bytes())
        .expect("signature");
    [
        ("X-Timestamp", timestamp.to_string()),
        ("X-Signature", signature),
    ]
}

/// Strip scheme and host from an issued link
pub fn path_of(download_url: &str) -> String {
    match download_url.find("/api/") {
        Some(idx) => download_url[idx..].to_string(),
        None => download_url.to_string(),
    }
}
