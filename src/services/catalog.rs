/// Read-only access to the image catalog
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Collection, Database, IndexModel};

use crate::models::ImageAsset;
use crate::utils::{PaginatedResponse, PaginationParams};

pub const IMAGES_COLLECTION: &str = "images";

/// Public sort keys -> stored fields
pub const SORT_FIELDS: &[(&str, &str)] = &[
    ("title", "title"),
    ("price", "price_cents"),
    ("created", "created_at"),
];

const DEFAULT_SORT_FIELD: &str = "created_at";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AssetCatalog: Send + Sync {
    async fn find(&self, asset_id: &str) -> Result<Option<ImageAsset>, CatalogError>;

    async fn list(&self, params: &PaginationParams) -> Result<PaginatedResponse<ImageAsset>, CatalogError>;
}

pub struct MongoCatalog {
    collection: Collection<ImageAsset>,
}

impl MongoCatalog {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<ImageAsset>(IMAGES_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), CatalogError> {
        let index = IndexModel::builder()
            .keys(doc! { "asset_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("asset_id_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(index).await?;
        Ok(())
    }
}

#[async_trait]
impl AssetCatalog for MongoCatalog {
    async fn find(&self, asset_id: &str) -> Result<Option<ImageAsset>, CatalogError> {
        Ok(self.collection.find_one(doc! { "asset_id": asset_id }).await?)
    }

    async fn list(&self, params: &PaginationParams) -> Result<PaginatedResponse<ImageAsset>, CatalogError> {
        let total = self.collection.count_documents(doc! {}).await?;

        let options = FindOptions::builder()
            .sort(params.build_sort_doc(DEFAULT_SORT_FIELD, SORT_FIELDS))
            .skip(params.skip())
            .limit(params.per_page())
            .build();

        let images: Vec<ImageAsset> = self
            .collection
            .find(doc! {})
            .with_options(options)
            .await?
            .try_collect()
            .await?;

        Ok(PaginatedResponse::new(images, total, params))
    }
}

/// In-memory catalog for tests and local runs
#[derive(Default)]
pub struct InMemoryCatalog {
    images: RwLock<HashMap<String, ImageAsset>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, asset: ImageAsset) {
        if let Ok(mut images) = self.images.write() {
            images.insert(asset.asset_id.clone(), asset);
        }
    }
}

fn poisoned<T>(_: T) -> CatalogError {
    CatalogError::Unavailable("lock poisoned".to_string())
}

#[async_trait]
impl AssetCatalog for InMemoryCatalog {
    async fn find(&self, asset_id: &str) -> Result<Option<ImageAsset>, CatalogError> {
        let images = self.images.read().map_err(poisoned)?;
        Ok(images.get(asset_id).cloned())
    }

    async fn list(&self, params: &PaginationParams) -> Result<PaginatedResponse<ImageAsset>, CatalogError> {
        let images = self.images.read().map_err(poisoned)?;
        let mut all: Vec<ImageAsset> = images.values().cloned().collect();

        match params.sort_field(DEFAULT_SORT_FIELD, SORT_FIELDS) {
            "title" => all.sort_by(|a, b| a.title.cmp(&b.title)),
            "price_cents" => all.sort_by_key(|a| a.price_cents),
            _ => all.sort_by_key(|a| a.created_at),
        }
        if !params.is_ascending() {
            all.reverse();
        }

        let total = all.len() as u64;
        let page: Vec<ImageAsset> = all
            .into_iter()
            .skip(params.skip() as usize)
            .take(params.per_page() as usize)
            .collect();

        Ok(PaginatedResponse::new(page, total, params))
    }
}
