use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A completed purchase
///
/// Written once when a payment is fulfilled, never updated or deleted.
/// (asset_id, transaction_id) is unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sale {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Catalog identifier of the purchased image
    pub asset_id: String,

    pub buyer_email: String,

    /// Payment provider transaction identifier (e.g. "pi_123")
    pub transaction_id: String,

    pub purchased_at: DateTime<Utc>,
}

impl Sale {
    pub fn new(asset_id: String, buyer_email: String, transaction_id: String) -> Self {
        Self {
            id: None,
            asset_id,
            buyer_email,
            transaction_id,
            purchased_at: Utc::now(),
        }
    }
}

/// Result of writing a sale to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// A sale for the same (asset, transaction) already exists; nothing written
    AlreadyRecorded,
}
