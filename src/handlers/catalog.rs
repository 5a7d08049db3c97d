/// Read-only catalog endpoints
use actix_web::{web, HttpResponse};

use crate::error::{ApiError, ApiResult};
use crate::models::ImageListItem;
use crate::state::AppState;
use crate::utils::PaginationParams;

/// GET /api/images?page=&per_page=&sort_by=&sort_order=
pub async fn list_images(
    query: web::Query<PaginationParams>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let page = state.catalog.list(&query).await?;
    Ok(HttpResponse::Ok().json(page.map(ImageListItem::from)))
}

/// GET /api/images/{asset_id}
pub async fn get_image(
    asset_id: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let asset = state
        .catalog
        .find(&asset_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Image not found".to_string()))?;

    Ok(HttpResponse::Ok().json(ImageListItem::from(asset)))
}
