//! Object passthrough: `GET /objects/{*key}` streams an object from the
//! configured store. With the local backend this is what `IMAGE_BASE_URL`
//! points at; with S3 the bucket usually serves objects itself.

use crate::{
    errors::AppError,
    services::{object_store::StoreError, retry::with_retry, thumbnail::THUMBNAIL_CONTENT_TYPE},
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};

pub async fn get_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let store = state.store();
    let body = with_retry(&state.retry, "get", StoreError::is_transient, || {
        store.get(&key)
    })
    .await?;

    // Thumbnails are JPEG whatever extension their source had.
    let content_type = if state.gallery.is_thumbnail_key(&key) {
        THUMBNAIL_CONTENT_TYPE
    } else {
        content_type_for(&key)
    };

    let len = body.len();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), content_type, len);
    Ok(response)
}

fn set_object_headers(headers: &mut HeaderMap, content_type: &'static str, len: usize) {
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
}

/// Content type from a path's extension.
pub fn content_type_for(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}
