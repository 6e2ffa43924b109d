//! Streams a single object back through the application.

use crate::{
    errors::BrowseError,
    services::store_client::{StoreClient, StoreError},
};
use bytes::Bytes;
use futures::stream::BoxStream;
use tracing::warn;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A proxied object ready to be written out chunk by chunk.
pub struct ProxiedFile {
    pub content_type: String,
    pub content_length: u64,
    pub body: BoxStream<'static, object_store::Result<Bytes>>,
}

/// Probe with `head`, then stream with `get`.
///
/// A missing object, or a key that cannot name one (`dir/`, `a//b`), is
/// `NotFound` on the probe; anything else, including the object vanishing
/// between probe and fetch, is `Upstream`.
pub async fn serve(store: &StoreClient, bucket: &str, key: &str) -> Result<ProxiedFile, BrowseError> {
    match store.head(bucket, key).await {
        Ok(_) => {}
        Err(err) if err.is_not_found() || matches!(err, StoreError::InvalidKey { .. }) => {
            return Err(BrowseError::NotFound(key.to_string()));
        }
        Err(source) => return Err(upstream(key, source)),
    }

    let object = store
        .get(bucket, key)
        .await
        .map_err(|source| upstream(key, source))?;

    Ok(ProxiedFile {
        content_type: object
            .content_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.into()),
        content_length: object.info.size,
        body: object.stream,
    })
}

fn upstream(key: &str, source: StoreError) -> BrowseError {
    warn!(key, error = %source, "upstream failure while proxying object");
    BrowseError::Upstream {
        key: key.to_string(),
        source,
    }
}
