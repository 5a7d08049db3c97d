/// Protected asset download
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use futures::{future, stream, StreamExt};

use crate::error::ApiResult;
use crate::services::download_guard::trace_stage;
use crate::services::{DownloadRequest, DownloadStage, OriginError};
use crate::state::AppState;

/// GET /api/download/{asset_id}?tx=...&exp=...&sig=...
pub async fn download_asset(
    req: HttpRequest,
    asset_id: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.path());

    let request = DownloadRequest {
        asset_id: &asset_id,
        path_and_query,
    };

    let delivery = match state.guard.admit(request).await {
        Ok(delivery) => delivery,
        Err(err) => {
            if err.is_authorization_failure() {
                log::warn!(
                    "Download of asset {} rejected at {:?}: {}",
                    asset_id,
                    err.stage(),
                    err
                );
            }
            return Err(err.into());
        }
    };

    log::info!(
        "⬇️  {:?} asset {} for transaction {}",
        DownloadStage::Streaming,
        delivery.asset.asset_id,
        delivery.sale.transaction_id
    );

    let disposition = ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(delivery.asset.download_file_name())],
    };

    let mut response = HttpResponse::Ok();
    response
        .content_type(delivery.asset.content_type.as_str())
        .insert_header(disposition)
        .insert_header(("Cache-Control", "private, no-store"));

    if let Some(len) = delivery.body.content_length {
        response.no_chunking(len);
    }

    // Runs once the origin stream is exhausted
    let asset_id = delivery.asset.asset_id.clone();
    let done = stream::once(async move {
        trace_stage(DownloadStage::Done, &asset_id);
        None::<Result<web::Bytes, OriginError>>
    })
    .filter_map(future::ready);

    Ok(response.streaming(delivery.body.stream.chain(done)))
}
