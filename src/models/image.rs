/// Catalog entries for purchasable images
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAsset {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Public identifier, used in download paths (e.g. "42")
    pub asset_id: String,

    pub title: String,

    pub description: Option<String>,

    /// Price in minor currency units
    pub price_cents: i64,

    /// ISO 4217 code, lowercase as the payment provider expects ("usd")
    pub currency: String,

    /// Where the full-resolution file lives:
    /// an absolute http(s) URL or a path relative to the local asset root
    pub storage_location: String,

    /// MIME type served with the download (e.g. "image/jpeg")
    pub content_type: String,

    /// File name offered to the buyer's browser
    pub file_name: String,

    pub created_at: DateTime<Utc>,
}

impl ImageAsset {
    /// File name safe to place in a Content-Disposition header
    pub fn download_file_name(&self) -> String {
        let cleaned: String = self
            .file_name
            .chars()
            .filter(|c| !c.is_control() && !matches!(c, '"' | '\\' | '/'))
            .collect();

        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            format!("image_{}", self.asset_id)
        } else {
            cleaned.to_string()
        }
    }
}

/// Public listing view; never exposes the storage location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageListItem {
    pub asset_id: String,
    pub title: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<ImageAsset> for ImageListItem {
    fn from(asset: ImageAsset) -> Self {
        ImageListItem {
            asset_id: asset.asset_id,
            title: asset.title,
            description: asset.description,
            price_cents: asset.price_cents,
            currency: asset.currency,
            content_type: asset.content_type,
            created_at: asset.created_at,
        }
    }
}
