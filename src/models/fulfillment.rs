use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Body of the payment-confirmation callback
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FulfillmentRequest {
    #[validate(custom(function = "validate_asset_id"))]
    pub asset_id: String,

    #[validate(email(message = "Invalid email format"))]
    pub buyer_email: String,

    #[validate(length(min = 1, max = 255, message = "Transaction id must be 1-255 characters"))]
    pub transaction_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentResponse {
    pub asset_id: String,
    pub transaction_id: String,
    /// Signed link; absolute when a public base URL is configured
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
    /// True when the callback was a retry for an already recorded sale
    pub already_recorded: bool,
}

/// Asset ids end up as a path segment of the download link
pub fn validate_asset_id(asset_id: &str) -> Result<(), ValidationError> {
    let valid = !asset_id.is_empty()
        && asset_id.len() <= 128
        && asset_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && asset_id != "."
        && asset_id != "..";

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("asset_id");
        err.message = Some("Asset id must be 1-128 characters of [A-Za-z0-9._-]".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(asset_id: &str, email: &str, tx: &str) -> FulfillmentRequest {
        FulfillmentRequest {
            asset_id: asset_id.to_string(),
            buyer_email: email.to_string(),
            transaction_id: tx.to_string(),
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request("42", "buyer@example.com", "pi_123").validate().is_ok());
        assert!(request("sunset-01.v2", "buyer@example.com", "pi_123").validate().is_ok());
    }

    #[test]
    fn test_invalid_email() {
        assert!(request("42", "not-an-email", "pi_123").validate().is_err());
    }

    #[test]
    fn test_invalid_asset_ids() {
        for id in ["", ".", "..", "a/b", "a?b", "a b", "%2e"] {
            assert!(
                request(id, "buyer@example.com", "pi_123").validate().is_err(),
                "accepted {:?}",
                id
            );
        }
        assert!(request(&"a".repeat(129), "buyer@example.com", "pi_123").validate().is_err());
    }

    #[test]
    fn test_empty_transaction_id() {
        assert!(request("42", "buyer@example.com", "").validate().is_err());
    }
}
