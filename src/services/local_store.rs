//! src/services/local_store.rs
//!
//! LocalStore: an `ObjectStore` backed by the local filesystem. Object
//! payloads are sharded beneath `base_path/{bucket}/{shard}/{shard}/{key}`,
//! where the shards come from MD5(bucket/key). There is no metadata
//! database: `head` and `list` read the filesystem directly.

use crate::{
    models::object::{ObjectInfo, Probe},
    services::object_store::{ObjectStore, StoreError, StoreResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{
    io::{self, ErrorKind},
    path::{Component, Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const TMP_PREFIX: &str = ".tmp-";

#[derive(Clone, Debug)]
pub struct LocalStore {
    /// Base directory on disk where buckets live.
    base_path: PathBuf,

    /// Bucket this store reads from and writes to.
    bucket: String,
}

impl LocalStore {
    /// Create a store rooted at `base_path/bucket`. The bucket directory is
    /// created if it does not exist yet.
    pub async fn open(base_path: impl Into<PathBuf>, bucket: &str) -> StoreResult<Self> {
        ensure_bucket_name_safe(bucket)?;
        let store = Self {
            base_path: base_path.into(),
            bucket: bucket.to_string(),
        };
        fs::create_dir_all(store.bucket_root()).await?;
        Ok(store)
    }

    fn bucket_root(&self) -> PathBuf {
        self.base_path.join(&self.bucket)
    }

    /// Two-level shard identifiers: the first two bytes of MD5(bucket/key)
    /// as lowercase hex (00-ff). Keeps directory fan-out bounded.
    fn object_shards(bucket: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(&self.bucket, key);
        let mut path = self.bucket_root();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Recover an object key from an on-disk path below the bucket root.
    /// Returns `None` for temp files, non-UTF-8 names and anything not under
    /// two shard dirs.
    fn key_from_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(self.bucket_root()).ok()?;
        // A segment that is not UTF-8 cannot be part of a valid key.
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str()?),
                _ => return None,
            }
        }
        let segments = parts.get(2..)?;
        let file_name = segments.last()?;
        if file_name.starts_with(TMP_PREFIX) {
            return None;
        }
        Some(segments.join("/"))
    }

    fn object_info(&self, key: &str, meta: &std::fs::Metadata) -> ObjectInfo {
        ObjectInfo {
            key: key.to_string(),
            size_bytes: Some(meta.len()),
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn head(&self, key: &str) -> StoreResult<Probe> {
        ensure_key_safe(key)?;
        match fs::metadata(self.object_path(key)).await {
            Ok(meta) if meta.is_file() => Ok(Probe::Found(self.object_info(key, &meta))),
            Ok(_) => Ok(Probe::NotFound),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Probe::NotFound),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        ensure_key_safe(key)?;
        match fs::read(self.object_path(key)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    /// Write to a temp file beside the target, fsync, then rename into
    /// place. Readers see either the previous object or the complete new one.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<()> {
        ensure_key_safe(key)?;
        let file_path = self.object_path(key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!("{}{}", TMP_PREFIX, Uuid::new_v4()));

        if let Err(err) = write_synced(&tmp_path, &body).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }

        debug!(
            "stored {} ({} bytes, {}) at {}",
            key,
            body.len(),
            content_type,
            file_path.display()
        );
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut pending = vec![self.bucket_root()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(StoreError::Io(err)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let meta = entry.metadata().await?;
                if meta.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Some(key) = self.key_from_path(&path) else {
                    continue;
                };
                if key.starts_with(prefix) {
                    objects.push(self.object_info(&key, &meta));
                }
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

async fn write_synced(path: &Path, body: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(body).await?;
    file.flush().await?;
    file.sync_all().await
}

/// Reject keys that could escape the bucket directory or collide with
/// the temp-file naming scheme.
fn ensure_key_safe(key: &str) -> StoreResult<()> {
    let invalid = || StoreError::InvalidKey(key.to_string());
    if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
        return Err(invalid());
    }
    if key.starts_with('/') || key.ends_with('/') || key.contains("..") {
        return Err(invalid());
    }
    if key
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
    {
        return Err(invalid());
    }
    if key.split('/').any(|segment| segment.is_empty() || segment.starts_with(TMP_PREFIX)) {
        return Err(invalid());
    }
    Ok(())
}

/// Bucket names become a directory name: 3-63 chars of lowercase letters,
/// digits, dots and hyphens, starting and ending alphanumeric.
fn ensure_bucket_name_safe(name: &str) -> StoreResult<()> {
    let valid_chars = name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'));
    let valid_edges = name
        .chars()
        .next()
        .zip(name.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());

    if (3..=63).contains(&name.len()) && valid_chars && valid_edges && !name.contains("..") {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(name.to_string()))
    }
}
