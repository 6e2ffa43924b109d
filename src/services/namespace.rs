//! Projects a flat, delimiter-grouped key listing onto a directory view.
//!
//! A listing call yields objects and common prefixes under a prefix; this
//! module turns them into sorted [`Entry`] values plus the breadcrumb trail,
//! optionally decorating files with public and presigned links.

use crate::{
    config::AppConfig,
    errors::BrowseError,
    models::entry::{Breadcrumb, DELIMITER, Entry, ListingRequest},
    services::store_client::{StoreClient, StoreListing},
};
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, warn};

/// A projected directory: what the listing view renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Projection {
    pub entries: Vec<Entry>,
    pub breadcrumbs: Vec<Breadcrumb>,
}

/// List `request.prefix` and project it.
///
/// A failed listing is reported as `ListingFailed`; a failed presign only
/// drops that entry's `presigned_url`.
pub async fn project(
    store: &StoreClient,
    config: &AppConfig,
    request: &ListingRequest,
) -> Result<Projection, BrowseError> {
    let listing = store
        .list(&request.bucket, &request.prefix)
        .await
        .map_err(|source| BrowseError::ListingFailed {
            prefix: request.prefix.clone(),
            source,
        })?;

    let mut entries = project_listing(&request.prefix, listing);
    for entry in entries.iter_mut().filter(|e| !e.is_dir) {
        entry.public_url = config.public_url(&entry.key);
    }
    if let Some(ttl) = config.presign_expiry {
        presign_entries(store, &request.bucket, &mut entries, ttl).await;
    }

    debug!(
        bucket = %request.bucket,
        prefix = %request.prefix,
        entries = entries.len(),
        "projected listing"
    );

    Ok(Projection {
        entries,
        breadcrumbs: breadcrumbs(&request.prefix),
    })
}

/// Turn a raw listing into sorted entries relative to `prefix`.
pub fn project_listing(prefix: &str, listing: StoreListing) -> Vec<Entry> {
    let mut entries = Vec::with_capacity(listing.objects.len() + listing.common_prefixes.len());

    for obj in listing.objects {
        // Folder markers: the prefix itself, `dir/` sentinels, or markers a
        // backend reported with the delimiter already stripped.
        if obj.key == prefix || obj.key.ends_with(DELIMITER) {
            continue;
        }
        let Some(name) = obj.key.strip_prefix(prefix).filter(|n| !n.is_empty()) else {
            continue;
        };
        entries.push(Entry::file(name, obj.key.as_str(), obj.size, obj.last_modified));
    }

    for common in listing.common_prefixes {
        let Some(name) = common
            .strip_prefix(prefix)
            .map(|rest| rest.trim_end_matches(DELIMITER))
            .filter(|n| !n.is_empty())
        else {
            continue;
        };
        let name = name.to_string();
        entries.push(Entry::directory(name, common));
    }

    // `sort_by` is stable, so ties keep discovery order.
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    entries
}

/// One crumb per non-empty segment of `prefix`, outermost first.
pub fn breadcrumbs(prefix: &str) -> Vec<Breadcrumb> {
    let mut acc = String::new();
    prefix
        .split(DELIMITER)
        .filter(|seg| !seg.is_empty())
        .map(|seg| {
            acc.push_str(seg);
            acc.push_str(DELIMITER);
            Breadcrumb {
                name: seg.to_string(),
                prefix: acc.clone(),
            }
        })
        .collect()
}

async fn presign_entries(store: &StoreClient, bucket: &str, entries: &mut [Entry], ttl: Duration) {
    let signed = join_all(entries.iter().map(|entry| async move {
        if entry.is_dir {
            return None;
        }
        match store.presign(bucket, &entry.key, ttl).await {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(key = %entry.key, error = %err, "failed to presign object");
                None
            }
        }
    }))
    .await;

    for (entry, url) in entries.iter_mut().zip(signed) {
        entry.presigned_url = url;
    }
}
