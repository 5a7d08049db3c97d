use actix_web::{HttpResponse, Result};
use serde_json::json;

/// Liveness probe
/// GET /health
pub async fn health() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "storefront-server",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
