//! HTTP handlers for the gallery listing, EXIF lookup and public config.

use crate::{
    errors::AppError,
    models::{exif::ExifRecord, gallery::GalleryEntry},
    services::{metadata, object_store::StoreError, retry::with_retry},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tokio::task;

/// `GET /images`: every gallery image with its thumbnail URL.
///
/// Thumbnails missing from the store are generated before the response is
/// sent.
pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<Vec<GalleryEntry>>, AppError> {
    let entries = state.gallery.list_gallery().await?;
    Ok(Json(entries))
}

/// `GET /exif/{*key}`: FNumber, ExposureTime and ISO of one original.
///
/// Every failure, a missing or rejected key included, is a 500 reported as
/// plain text.
pub async fn get_exif(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ExifRecord>, AppError> {
    let store = state.store();
    let source = with_retry(&state.retry, "get", StoreError::is_transient, || {
        store.get(&key)
    })
    .await
    .map_err(|err| {
        AppError::internal("STORE_ERROR", "Failed to read EXIF data", err.to_string()).into_plain()
    })?;

    let record = task::spawn_blocking(move || metadata::extract(&source))
        .await
        .map_err(|err| {
            AppError::internal("WORKER_ERROR", "EXIF worker did not complete", err.to_string())
                .into_plain()
        })?
        .map_err(|err| AppError::from(err).into_plain())?;

    Ok(Json(record))
}

#[derive(Serialize)]
pub struct PublicConfig {
    #[serde(rename = "IMAGE_BASE_URL")]
    image_base_url: String,
}

/// `GET /config`: the public base URL the front end prefixes keys with.
pub async fn public_config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(PublicConfig {
        image_base_url: state.image_base_url.clone(),
    })
}
