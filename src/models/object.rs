//! Represents an object as reported by the object store.

use chrono::{DateTime, Utc};

/// Listing/probe metadata for one stored object. Carries no payload bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Size in bytes, when the backend reports it.
    pub size_bytes: Option<u64>,

    /// Timestamp when the object was last written.
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectInfo {
    #[cfg(test)]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size_bytes: None,
            last_modified: None,
        }
    }

    /// Lowercased file extension of the key's final segment, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.key.rsplit('/').next().unwrap_or(&self.key);
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Result of a metadata-only existence check.
///
/// Failures other than "not found" are reported through `StoreError`, so a
/// caller branches on a closed set: found, not found, or an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Probe {
    Found(ObjectInfo),
    NotFound,
}
