mod catalog;
mod download;
mod fulfillment;
mod health;

use actix_web::web;

pub use catalog::{get_image, list_images};
pub use download::download_asset;
pub use fulfillment::{fulfill_order, SIGNATURE_HEADER, TIMESTAMP_HEADER};
pub use health::health;

/// Routing table shared by the server binary and the integration tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health)).service(
        web::scope("/api")
            .route("/images", web::get().to(list_images))
            .route("/images/{asset_id}", web::get().to(get_image))
            .route("/fulfill", web::post().to(fulfill_order))
            .route("/download/{asset_id}", web::get().to(download_asset)),
    );
}
