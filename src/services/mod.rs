//! BrowserService: the state shared by every handler.
//!
//! It pairs the read-only configuration with the store client and exposes the
//! three request-level operations: list a prefix, proxy a file, thumbnail an
//! image. Cloning is cheap; nothing in here is mutated after startup.

pub mod file_proxy;
pub mod namespace;
pub mod store_client;
pub mod thumbnail;

use crate::{
    config::AppConfig,
    errors::BrowseError,
    models::entry::ListingRequest,
    views::listing::ListingPage,
};
use file_proxy::ProxiedFile;
use std::sync::Arc;
use store_client::StoreClient;
use thumbnail::Thumbnail;
use tracing::error;

#[derive(Clone)]
pub struct BrowserService {
    pub config: Arc<AppConfig>,
    pub store: StoreClient,
}

impl BrowserService {
    pub fn new(config: Arc<AppConfig>, store: StoreClient) -> Self {
        Self { config, store }
    }

    pub fn bucket(&self) -> &str {
        &self.config.store.bucket
    }

    /// Listing page for `prefix`. A failed listing becomes an inline error.
    pub async fn list_directory(&self, prefix: &str) -> ListingPage {
        let request = ListingRequest::new(self.bucket(), prefix);
        match namespace::project(&self.store, &self.config, &request).await {
            Ok(projection) => ListingPage::new(&request, projection),
            Err(err) => {
                error!(bucket = %request.bucket, prefix = %request.prefix, error = %err, "listing failed");
                ListingPage::failed(&request, err)
            }
        }
    }

    pub async fn serve_file(&self, key: &str) -> Result<ProxiedFile, BrowseError> {
        file_proxy::serve(&self.store, self.bucket(), key).await
    }

    pub async fn thumbnail(&self, key: &str, if_none_match: Option<&str>) -> Thumbnail {
        thumbnail::thumbnail(&self.store, &self.config, self.bucket(), key, if_none_match).await
    }
}
