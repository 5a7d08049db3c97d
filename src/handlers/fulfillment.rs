/// Payment-confirmation callback: record the sale, hand out a download link
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{TimeZone, Utc};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::{FulfillmentRequest, FulfillmentResponse, RecordOutcome, Sale};
use crate::security::{construct_callback_payload, validate_timestamp, verify_signature, QueryParams};
use crate::services::{download_path, TRANSACTION_PARAM};
use crate::state::AppState;

pub const TIMESTAMP_HEADER: &str = "X-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-Signature";

fn header<'a>(req: &'a HttpRequest, name: &str) -> ApiResult<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {} header", name)))
}

/// POST /api/fulfill
///
/// Headers:
/// - X-Timestamp: Unix timestamp
/// - X-Signature: HMAC-SHA256("{timestamp}.{raw body}", webhook secret), hex
pub async fn fulfill_order(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let timestamp: i64 = header(&req, TIMESTAMP_HEADER)?
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid timestamp format".to_string()))?;
    let signature = header(&req, SIGNATURE_HEADER)?;

    if !validate_timestamp(timestamp) {
        return Err(ApiError::Unauthorized("Stale callback timestamp".to_string()));
    }

    let payload = construct_callback_payload(timestamp, &body);
    if !verify_signature(&payload, state.webhook_secret.as_bytes(), signature) {
        log::warn!("Rejected fulfillment callback with invalid signature");
        return Err(ApiError::Unauthorized("Invalid callback signature".to_string()));
    }

    let order: FulfillmentRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
    order.validate()?;

    let asset = state
        .catalog
        .find(&order.asset_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Image not found".to_string()))?;

    let sale = Sale::new(
        asset.asset_id.clone(),
        order.buyer_email.clone(),
        order.transaction_id.clone(),
    );
    let outcome = state.ledger.record(&sale).await?;

    let params = QueryParams::new().with(TRANSACTION_PARAM, order.transaction_id.as_str());
    let signed = state
        .signer
        .sign(&download_path(&asset.asset_id), &params, Some(state.link_ttl_secs))
        .map_err(|e| ApiError::Internal(format!("Failed to sign download link: {}", e)))?;

    let expires_at = Utc
        .timestamp_opt(signed.expires_at, 0)
        .single()
        .ok_or_else(|| ApiError::Internal("Link expiry out of range".to_string()))?;

    let already_recorded = outcome == RecordOutcome::AlreadyRecorded;
    if already_recorded {
        log::info!(
            "Re-issued download link for asset {} (transaction {} already recorded)",
            asset.asset_id,
            order.transaction_id
        );
    } else {
        log::info!(
            "✅ Sale recorded: asset {} transaction {}",
            asset.asset_id,
            order.transaction_id
        );
    }

    let response = FulfillmentResponse {
        asset_id: asset.asset_id,
        transaction_id: order.transaction_id,
        download_url: state.public_url(&signed.path_and_query),
        expires_at,
        already_recorded,
    };

    if already_recorded {
        Ok(HttpResponse::Ok().json(response))
    } else {
        Ok(HttpResponse::Created().json(response))
    }
}
