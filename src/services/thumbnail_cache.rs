//! ThumbnailCache: lazily materializes thumbnails in the object store.
//!
//! `resolve` maps a source key to its thumbnail key and guarantees that, on
//! success, the thumbnail object exists in full. The flow per call:
//!
//! 1. name the thumbnail (`KeyNamer`)
//! 2. probe the store with `head`
//! 3. hit: return the key, nothing else is read
//! 4. miss: fetch the source, generate on the blocking pool, `put` as
//!    `image/jpeg`, return the key
//!
//! A probe failure other than "not found" fails the call and never
//! triggers generation. Steps 2-4 run under a per-key async lock, so
//! concurrent first requests inside one process generate once. Separate
//! processes can still race; both write equivalent bytes and the last
//! write wins.

use crate::{
    models::object::Probe,
    services::{
        naming::KeyNamer,
        object_store::{ObjectStore, StoreError},
        retry::{RetryConfig, with_retry},
        thumbnail::{self, JpegQuality, THUMBNAIL_CONTENT_TYPE, ThumbnailError},
    },
};
use bytes::Bytes;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tokio::{
    sync::{Mutex as AsyncMutex, MutexGuard},
    task,
};
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("store error for `{key}`: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("thumbnail generation failed for `{key}`: {source}")]
    Thumbnail {
        key: String,
        #[source]
        source: ThumbnailError,
    },
    #[error("thumbnail worker for `{key}` did not complete: {source}")]
    Worker {
        key: String,
        #[source]
        source: task::JoinError,
    },
}

/// Whether a resolution found an existing thumbnail or produced one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Generated,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub thumbnail_key: String,
    pub outcome: CacheOutcome,
}

#[derive(Clone)]
pub struct ThumbnailCache {
    store: Arc<dyn ObjectStore>,
    namer: KeyNamer,
    quality: Option<JpegQuality>,
    retry: RetryConfig,
    locks: Arc<KeyLocks>,
}

impl ThumbnailCache {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        namer: KeyNamer,
        quality: Option<JpegQuality>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            store,
            namer,
            quality,
            retry,
            locks: Arc::new(KeyLocks::default()),
        }
    }

    pub fn namer(&self) -> &KeyNamer {
        &self.namer
    }

    /// Return the thumbnail key for `source_key`, generating and storing the
    /// thumbnail first if it does not exist yet.
    ///
    /// The work runs on its own task: a caller that goes away mid-flight
    /// does not cancel a started generation, the thumbnail still lands.
    pub async fn resolve(&self, source_key: &str) -> Result<Resolved, ResolveError> {
        let cache = self.clone();
        let key = source_key.to_string();
        task::spawn(async move { cache.resolve_detached(&key).await })
            .await
            .map_err(|source| ResolveError::Worker {
                key: source_key.to_string(),
                source,
            })?
    }

    async fn resolve_detached(&self, source_key: &str) -> Result<Resolved, ResolveError> {
        let thumbnail_key = self.namer.thumbnail_key_for(source_key);
        let entry = KeyLocks::acquire(&self.locks, &thumbnail_key);
        let outcome = {
            let _guard = entry.lock().await;
            self.resolve_locked(source_key, &thumbnail_key).await
        };
        drop(entry);

        outcome.map(|outcome| Resolved {
            thumbnail_key,
            outcome,
        })
    }

    async fn resolve_locked(
        &self,
        source_key: &str,
        thumbnail_key: &str,
    ) -> Result<CacheOutcome, ResolveError> {
        let probe = with_retry(&self.retry, "head", StoreError::is_transient, || {
            self.store.head(thumbnail_key)
        })
        .await
        .map_err(store_error(thumbnail_key))?;

        if let Probe::Found(info) = probe {
            debug!(
                size_bytes = ?info.size_bytes,
                last_modified = ?info.last_modified,
                "thumbnail cache hit: {} -> {}",
                source_key,
                thumbnail_key
            );
            return Ok(CacheOutcome::Hit);
        }

        info!(
            "thumbnail cache miss: generating {} from {}",
            thumbnail_key, source_key
        );
        let source = with_retry(&self.retry, "get", StoreError::is_transient, || {
            self.store.get(source_key)
        })
        .await
        .map_err(store_error(source_key))?;

        let rendered = self.render(source_key, source).await?;
        let size = rendered.len();

        self.store
            .put(thumbnail_key, rendered, THUMBNAIL_CONTENT_TYPE)
            .await
            .map_err(store_error(thumbnail_key))?;

        info!("stored thumbnail {} ({} bytes)", thumbnail_key, size);
        Ok(CacheOutcome::Generated)
    }

    async fn render(&self, source_key: &str, source: Bytes) -> Result<Bytes, ResolveError> {
        let quality = self.quality;
        task::spawn_blocking(move || thumbnail::generate(&source, quality))
            .await
            .map_err(|source| ResolveError::Worker {
                key: source_key.to_string(),
                source,
            })?
            .map(Bytes::from)
            .map_err(|source| ResolveError::Thumbnail {
                key: source_key.to_string(),
                source,
            })
    }
}

fn store_error(key: &str) -> impl FnOnce(StoreError) -> ResolveError {
    let key = key.to_string();
    move |source| ResolveError::Store { key, source }
}

/// Per-key async locks. Entries are dropped once no caller holds them.
#[derive(Default)]
struct KeyLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// A claim on one key's lock. Dropping it, even from a cancelled future,
/// removes the map entry when it was the last claim.
struct KeyLock {
    locks: Arc<KeyLocks>,
    key: String,
    mutex: Arc<AsyncMutex<()>>,
}

impl KeyLocks {
    fn acquire(locks: &Arc<Self>, key: &str) -> KeyLock {
        let mut map = locks.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mutex = map.entry(key.to_string()).or_default().clone();
        KeyLock {
            locks: locks.clone(),
            key: key.to_string(),
            mutex,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

impl KeyLock {
    async fn lock(&self) -> MutexGuard<'_, ()> {
        self.mutex.lock().await
    }
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        let mut map = self.locks.inner.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map and this claim reference the mutex.
        let last = map
            .get(&self.key)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.mutex) && Arc::strong_count(entry) == 2);
        if last {
            map.remove(&self.key);
        }
    }
}
