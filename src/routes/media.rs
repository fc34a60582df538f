use actix_web::{web, HttpResponse};

use crate::{
    compositor::{render_preview, PreviewRequest},
    error::StudioResult,
    state::AppState,
    upload::{self, UploadRequest},
};

/// Decoding, resizing and writing run on the blocking pool; payloads reach tens of MB.
pub async fn upload_image(state: &AppState, request: UploadRequest) -> StudioResult<HttpResponse> {
    let dir = state.config.upload_dir.clone();
    let max_bytes = state.config.max_upload_bytes;
    let content_type = request.content_type.clone();

    let stored = web::block(move || upload::process(&request, &dir, max_bytes))
        .await?
        .inspect_err(|err| log::warn!("Upload of {content_type} rejected: {err}"))?;
    log::info!("Stored upload {} ({}x{})", stored.url, stored.width, stored.height);
    Ok(HttpResponse::Ok().json(stored))
}

pub async fn compose_preview(state: &AppState, request: PreviewRequest) -> StudioResult<HttpResponse> {
    let max_bytes = state.config.max_upload_bytes;
    let preview = web::block(move || render_preview(&request, max_bytes)).await??;
    Ok(HttpResponse::Ok().json(preview))
}
