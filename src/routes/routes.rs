//! Defines the gallery's HTTP surface.
//!
//! ## Structure
//! - **Pages**
//!   - `GET /`: landing page from the static directory
//!   - anything unmatched: static asset, else the landing page
//!
//! - **API**
//!   - `GET /images`: gallery listing, generating missing thumbnails
//!   - `GET /exif/{*key}`: exposure metadata of one original
//!   - `GET /config`: public base URL for image links
//!   - `GET /objects/{*key}`: object passthrough from the store
//!
//! - **Probes**
//!   - `GET /healthz`, `GET /readyz`
//!
//! The wildcard `*key` allows nested keys like `images/2025/img.jpg`.

use crate::{
    handlers::{
        gallery_handlers::{get_exif, list_images, public_config},
        health_handlers::{healthz, readyz},
        object_handlers::get_object,
        static_handlers::{fallback, index},
    },
    state::AppState,
};
use axum::{Router, routing::get};

/// Build the router. Handlers share `AppState`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // api
        .route("/images", get(list_images))
        .route("/exif/{*key}", get(get_exif))
        .route("/config", get(public_config))
        .route("/objects/{*key}", get(get_object))
        // pages
        .route("/", get(index))
        .fallback(fallback)
}
