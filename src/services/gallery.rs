//! GalleryService: builds the `GET /images` listing.
//!
//! Lists every object under the source prefix, keeps images sitting
//! directly in that directory, resolves each through the thumbnail cache
//! and returns absolute URLs for the original and its preview.
//!
//! Resolutions run concurrently, at most `max_concurrency` at a time, and
//! the listing waits for all of them. The first failure fails the whole
//! listing. Resolutions already started run on their own tasks and still
//! store their thumbnails; ones not yet started are skipped.

use crate::{
    models::{gallery::GalleryEntry, object::ObjectInfo},
    services::{
        object_store::{ObjectStore, StoreError},
        thumbnail_cache::{CacheOutcome, ResolveError, ThumbnailCache},
    },
};
use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// File extensions (lowercase) the gallery treats as source images.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("listing `{prefix}` failed: {source}")]
    List {
        prefix: String,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[derive(Clone)]
pub struct GalleryService {
    store: Arc<dyn ObjectStore>,
    cache: ThumbnailCache,
    /// Source directory with a trailing slash, or empty for the bucket root.
    source_prefix: String,
    base_url: String,
    max_concurrency: usize,
}

impl GalleryService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        cache: ThumbnailCache,
        source_prefix: &str,
        base_url: &str,
        max_concurrency: usize,
    ) -> Self {
        Self {
            store,
            cache,
            source_prefix: normalize_prefix(source_prefix),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn source_prefix(&self) -> &str {
        &self.source_prefix
    }

    /// True for keys inside the thumbnail directory.
    pub fn is_thumbnail_key(&self, key: &str) -> bool {
        key.strip_prefix(self.cache.namer().preview_dir())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Absolute URL of an object key under the public base URL.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Produce the full listing. Order follows the store's key order.
    pub async fn list_gallery(&self) -> Result<Vec<GalleryEntry>, GalleryError> {
        let objects = self
            .store
            .list(&self.source_prefix)
            .await
            .map_err(|source| GalleryError::List {
                prefix: self.source_prefix.clone(),
                source,
            })?;
        let total = objects.len();

        let sources: Vec<ObjectInfo> = objects
            .into_iter()
            .filter(|obj| is_gallery_source(&self.source_prefix, obj))
            .collect();
        debug!(
            "{} of {} objects under `{}` are gallery sources",
            sources.len(),
            total,
            self.source_prefix
        );

        let resolved: Vec<(GalleryEntry, CacheOutcome)> = stream::iter(sources)
            .map(|obj| async move {
                let resolved = self.cache.resolve(&obj.key).await?;
                let entry = GalleryEntry {
                    original: self.public_url(&obj.key),
                    thumbnail: self.public_url(&resolved.thumbnail_key),
                };
                Ok::<_, GalleryError>((entry, resolved.outcome))
            })
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        let generated = resolved
            .iter()
            .filter(|(_, outcome)| *outcome == CacheOutcome::Generated)
            .count();
        info!(
            "gallery listing resolved {} images ({} thumbnails generated)",
            resolved.len(),
            generated
        );
        Ok(resolved.into_iter().map(|(entry, _)| entry).collect())
    }
}

/// `images` and `images/` both become `images/`; empty stays empty.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// An object is listed when its extension is allowed and it sits directly
/// in the source directory. Nested keys (including the preview directory)
/// are excluded.
pub fn is_gallery_source(prefix: &str, obj: &ObjectInfo) -> bool {
    let Some(relative) = obj.key.strip_prefix(prefix) else {
        return false;
    };
    if relative.is_empty() || relative.contains('/') {
        return false;
    }
    obj.extension()
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}
