//! `ObjectStore` over an S3-compatible bucket (AWS S3, MinIO, R2, ...).
//!
//! Calls go through `aws-sdk-s3` with the SDK's default transport timeouts;
//! no per-call deadline is layered on top.

use crate::{
    config::S3Settings,
    models::object::{ObjectInfo, Probe},
    services::object_store::{ObjectStore, StoreError, StoreResult},
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from explicit settings. Static credentials are used
    /// when both halves are configured, otherwise the default provider
    /// chain applies. Path-style addressing keeps MinIO endpoints working.
    pub async fn connect(settings: &S3Settings, bucket: &str) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));

        if let (Some(access_key), Some(secret_key)) =
            (&settings.access_key_id, &settings.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "thumbnail-gallery",
            ));
        }

        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config).force_path_style(true);
        if let Some(endpoint) = settings.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
        }
    }
}

fn to_chrono(ts: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head(&self, key: &str) -> StoreResult<Probe> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => Ok(Probe::Found(ObjectInfo {
                key: key.to_string(),
                size_bytes: output.content_length().and_then(|n| u64::try_from(n).ok()),
                last_modified: output.last_modified().and_then(to_chrono),
            })),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
                Ok(Probe::NotFound)
            }
            Err(err) => Err(StoreError::backend(
                "head",
                key,
                DisplayErrorContext(err),
            )),
        }
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    StoreError::NotFound(key.to_string())
                } else {
                    StoreError::backend("get", key, DisplayErrorContext(err))
                }
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|err| StoreError::backend("get", key, err))?;
        Ok(body.into_bytes())
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<()> {
        let len = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| StoreError::backend("put", key, DisplayErrorContext(err)))?;
        debug!("uploaded {} ({} bytes) to bucket {}", key, len, self.bucket);
        Ok(())
    }

    /// Follows continuation tokens until the listing is exhausted.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|err| StoreError::backend("list", prefix, DisplayErrorContext(err)))?;

            objects.extend(response.contents().iter().filter_map(|obj| {
                obj.key().map(|key| ObjectInfo {
                    key: key.to_string(),
                    size_bytes: obj.size().and_then(|n| u64::try_from(n).ok()),
                    last_modified: obj.last_modified().and_then(to_chrono),
                })
            }));

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(objects)
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
