//! Shared state handed to every handler.

use crate::services::{gallery::GalleryService, object_store::ObjectStore, retry::RetryConfig};
use std::{path::PathBuf, sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub gallery: GalleryService,
    pub retry: RetryConfig,
    /// Value exposed by `GET /config`.
    pub image_base_url: String,
    pub static_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        self.gallery.store()
    }
}
