//! The object-store contract consumed by the thumbnail cache and the
//! gallery lister.
//!
//! Backends implement `head`/`get`/`put`/`list` against a single bucket.
//! `head` is the probe: it reports absence as `Probe::NotFound` rather than
//! as an error, so callers never have to inspect error text to tell a miss
//! from a failure.

use crate::models::object::{ObjectInfo, Probe};
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error("{operation} `{key}` failed: {message}")]
    Backend {
        operation: &'static str,
        key: String,
        message: String,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StoreError {
    pub fn backend(operation: &'static str, key: &str, err: impl std::fmt::Display) -> Self {
        StoreError::Backend {
            operation,
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    /// Failures worth another attempt. A typed miss or a rejected key will
    /// not change on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Backend { .. } | StoreError::Io(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A bucket-scoped object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Metadata-only existence check. Never transfers the body.
    async fn head(&self, key: &str) -> StoreResult<Probe>;

    /// Fetch the full object body. A missing key is `StoreError::NotFound`.
    async fn get(&self, key: &str) -> StoreResult<Bytes>;

    /// Write (or overwrite) an object. The object becomes visible to `head`
    /// and `get` only once its full content is committed.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<()>;

    /// Every object whose key starts with `prefix`, in key order.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectInfo>>;

    /// Short backend name for logs and readiness output.
    fn name(&self) -> &'static str;
}
