//! In-memory `ObjectStore` used by tests. Counts calls per operation and can
//! be told to fail probes or reads to exercise error paths.

use crate::{
    models::object::{ObjectInfo, Probe},
    services::object_store::{ObjectStore, StoreError, StoreResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, (Bytes, String)>>,
    pub heads: AtomicUsize,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    /// Number of upcoming `head` calls that fail with a backend error.
    pub failing_heads: AtomicUsize,
    /// Number of upcoming `get` calls that fail with a backend error.
    pub failing_gets: AtomicUsize,
    /// Artificial latency for `head`, to widen race windows in tests.
    pub head_delay: Option<Duration>,
    /// Artificial latency for `put`, applied before the object is stored.
    pub put_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_head_delay(delay: Duration) -> Self {
        Self {
            head_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn with_put_delay(delay: Duration) -> Self {
        Self {
            put_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn insert(&self, key: &str, body: impl Into<Bytes>) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (body.into(), "application/octet-stream".into()));
    }

    pub fn object(&self, key: &str) -> Option<(Bytes, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head(&self, key: &str) -> StoreResult<Probe> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.head_delay {
            tokio::time::sleep(delay).await;
        }
        if Self::take_failure(&self.failing_heads) {
            return Err(StoreError::backend("head", key, "access denied"));
        }
        let objects = self.objects.lock().unwrap();
        Ok(match objects.get(key) {
            Some((body, _)) => Probe::Found(ObjectInfo {
                key: key.to_string(),
                size_bytes: Some(body.len() as u64),
                last_modified: None,
            }),
            None => Probe::NotFound,
        })
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_gets) {
            return Err(StoreError::backend("get", key, "connection reset"));
        }
        self.object(key)
            .map(|(body, _)| body)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.put_delay {
            tokio::time::sleep(delay).await;
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectInfo>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, (body, _))| ObjectInfo {
                key: key.clone(),
                size_bytes: Some(body.len() as u64),
                last_modified: None,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
