//! src/services/store_client.rs
//!
//! StoreClient: the read-only capability surface over an S3-compatible
//! bucket: delimiter listing, head, streamed get and presigned links. It is
//! bound to a single bucket; everything else in the crate goes through it.

use crate::{config::StoreConfig, models::entry::DELIMITER};
use axum::http::Method;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use object_store::{
    Attribute, ObjectMeta, ObjectStore, aws::AmazonS3Builder, path::Path, signer::Signer,
};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket `{0}` is not served by this store client")]
    UnknownBucket(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    NotFound { bucket: String, key: String },
    #[error("invalid object key `{key}`: {reason}")]
    InvalidKey { key: String, reason: String },
    #[error("presigned URLs are not available for this store")]
    PresignUnavailable,
    #[error(transparent)]
    Backend(#[from] object_store::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata of one concrete object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

impl From<ObjectMeta> for ObjectInfo {
    fn from(meta: ObjectMeta) -> Self {
        Self {
            key: meta.location.to_string(),
            size: meta.size,
            last_modified: meta.last_modified,
        }
    }
}

/// Raw result of a delimiter-bounded listing, in store order.
#[derive(Clone, Debug, Default)]
pub struct StoreListing {
    /// Direct children under the prefix.
    pub objects: Vec<ObjectInfo>,
    /// One level of virtual subdirectories, each ending with the delimiter.
    pub common_prefixes: Vec<String>,
}

/// An object being fetched. Dropping `stream` abandons the transfer.
pub struct ObjectBody {
    pub info: ObjectInfo,
    pub content_type: Option<String>,
    pub stream: BoxStream<'static, object_store::Result<Bytes>>,
}

#[derive(Clone, Debug)]
pub struct StoreClient {
    bucket: String,
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
}

impl StoreClient {
    /// Wrap an existing store. Without a signer, `presign` reports unavailable.
    pub fn new(
        bucket: impl Into<String>,
        store: Arc<dyn ObjectStore>,
        signer: Option<Arc<dyn Signer>>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            store,
            signer,
        }
    }

    /// Build an S3 client (path-style, SigV4) from connection settings.
    pub fn from_config(cfg: &StoreConfig) -> StoreResult<Self> {
        let s3 = AmazonS3Builder::new()
            .with_endpoint(&cfg.endpoint)
            .with_allow_http(cfg.endpoint.starts_with("http://"))
            .with_access_key_id(&cfg.access_key_id)
            .with_secret_access_key(&cfg.secret_access_key)
            .with_region(&cfg.region)
            .with_bucket_name(&cfg.bucket)
            .build()?;
        let s3 = Arc::new(s3);
        let signer: Arc<dyn Signer> = s3.clone();

        debug!(
            bucket = %cfg.bucket,
            endpoint = %cfg.endpoint,
            region = %cfg.region,
            "Created S3 store client"
        );

        Ok(Self::new(cfg.bucket.clone(), s3, Some(signer)))
    }

    /// List direct children and common prefixes under `prefix`.
    ///
    /// `prefix` is either empty or delimiter-terminated.
    pub async fn list(&self, bucket: &str, prefix: &str) -> StoreResult<StoreListing> {
        self.ensure_bucket(bucket)?;
        let location = if prefix.is_empty() {
            None
        } else {
            Some(parse_path(prefix)?)
        };

        let result = self.store.list_with_delimiter(location.as_ref()).await?;

        Ok(StoreListing {
            objects: result.objects.into_iter().map(ObjectInfo::from).collect(),
            common_prefixes: result
                .common_prefixes
                .into_iter()
                .map(|p| format!("{p}{DELIMITER}"))
                .collect(),
        })
    }

    /// Metadata-only probe.
    pub async fn head(&self, bucket: &str, key: &str) -> StoreResult<ObjectInfo> {
        self.ensure_bucket(bucket)?;
        let location = parse_object_key(key)?;
        self.store
            .head(&location)
            .await
            .map(ObjectInfo::from)
            .map_err(|err| self.classify(key, err))
    }

    /// Start a full fetch; the body is not read until `stream` is polled.
    pub async fn get(&self, bucket: &str, key: &str) -> StoreResult<ObjectBody> {
        self.ensure_bucket(bucket)?;
        let location = parse_object_key(key)?;
        let result = self
            .store
            .get(&location)
            .await
            .map_err(|err| self.classify(key, err))?;

        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| value.to_string());
        let info = ObjectInfo::from(result.meta.clone());

        Ok(ObjectBody {
            info,
            content_type,
            stream: result.into_stream(),
        })
    }

    /// Time-limited GET link for `key`.
    pub async fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> StoreResult<String> {
        self.ensure_bucket(bucket)?;
        let signer = self.signer.as_ref().ok_or(StoreError::PresignUnavailable)?;
        let location = parse_object_key(key)?;
        let url = signer.signed_url(Method::GET, &location, ttl).await?;
        Ok(url.to_string())
    }

    fn ensure_bucket(&self, bucket: &str) -> StoreResult<()> {
        if bucket == self.bucket {
            Ok(())
        } else {
            Err(StoreError::UnknownBucket(bucket.to_string()))
        }
    }

    fn classify(&self, key: &str, err: object_store::Error) -> StoreError {
        match err {
            object_store::Error::NotFound { .. } => StoreError::NotFound {
                bucket: self.bucket.clone(),
                key: key.to_string(),
            },
            other => StoreError::Backend(other),
        }
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

fn parse_path(raw: &str) -> StoreResult<Path> {
    Path::parse(raw).map_err(|err| StoreError::InvalidKey {
        key: raw.to_string(),
        reason: err.to_string(),
    })
}

/// Object keys name a concrete object: non-empty, not delimiter-terminated.
fn parse_object_key(key: &str) -> StoreResult<Path> {
    if key.is_empty() || key.ends_with(DELIMITER) {
        return Err(StoreError::InvalidKey {
            key: key.to_string(),
            reason: "does not name an object".into(),
        });
    }
    parse_path(key)
}
