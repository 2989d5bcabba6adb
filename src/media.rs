use axum::extract::Multipart;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::{
    accounts::Asset,
    error::{ApiError, ApiResult},
    state::AppState,
    storage::ext_from_mime,
    upstream,
};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub body: Bytes,
    pub content_type: String,
}

/// Reads the image sent under `field` and ignores every other part.
pub async fn read_image(mp: &mut Multipart, field: &str) -> ApiResult<ImageUpload> {
    while let Some(part) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if part.name() != Some(field) {
            continue;
        }
        let content_type = part.content_type().unwrap_or_default().to_string();
        if ext_from_mime(&content_type).is_none() {
            return Err(ApiError::Validation(vec!["Only image files are allowed".into()]));
        }
        let body = part
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        if body.is_empty() {
            return Err(ApiError::Validation(vec![format!("{field} file is empty")]));
        }
        if body.len() > MAX_UPLOAD_BYTES {
            return Err(ApiError::Validation(vec!["File exceeds 5 MB".into()]));
        }
        return Ok(ImageUpload { body, content_type });
    }
    Err(ApiError::Validation(vec![format!("{field} file is required")]))
}

pub async fn upload_image(
    state: &AppState,
    folder: &str,
    upload: &ImageUpload,
) -> ApiResult<Asset> {
    let asset = upstream::call(&state.retry, "media", || {
        state
            .media
            .upload(folder, upload.body.clone(), &upload.content_type)
    })
    .await?;
    debug!(public_id = %asset.public_id, "image uploaded");
    Ok(asset)
}

/// Deletes a replaced asset. Failures only leak the remote object.
pub async fn discard_asset(state: &AppState, asset: Option<Asset>) {
    let Some(asset) = asset else { return };
    if let Err(e) = state.media.destroy(&asset.public_id).await {
        warn!(public_id = %asset.public_id, error = %e, "failed to delete old asset");
    }
}
