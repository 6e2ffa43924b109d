//! Represents items surfaced by a directory listing.

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;

/// Separator used to group flat object keys into virtual directories.
pub const DELIMITER: &str = "/";

/// A single item (file or virtual directory) within a listing.
///
/// Directory entries only ever carry `name` and `key`; build entries through
/// [`Entry::directory`] and [`Entry::file`] so that invariant holds.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Display name relative to the requested prefix.
    pub name: String,

    /// Full object key. Directory keys end with the delimiter, file keys never do.
    pub key: String,

    /// True for a common prefix, false for a concrete object.
    pub is_dir: bool,

    /// Size in bytes as reported by the store (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Last modification instant as reported by the store (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,

    /// URL that streams the object through this application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,

    /// Direct link below the configured public base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Time-limited signed link straight to the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presigned_url: Option<String>,
}

impl Entry {
    /// Virtual directory derived from a common prefix.
    pub fn directory(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            is_dir: true,
            size: None,
            last_modified: None,
            file_url: None,
            public_url: None,
            presigned_url: None,
        }
    }

    /// Concrete object. The proxy URL is derived from the key alone.
    pub fn file(
        name: impl Into<String>,
        key: impl Into<String>,
        size: u64,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let key = key.into();
        Self {
            name: name.into(),
            file_url: Some(file_url(&key)),
            key,
            is_dir: false,
            size: Some(size),
            last_modified: Some(last_modified),
            public_url: None,
            presigned_url: None,
        }
    }

    /// The link a viewer should follow: presigned, then public, then proxied.
    pub fn preferred_url(&self) -> Option<&str> {
        self.presigned_url
            .as_deref()
            .or(self.public_url.as_deref())
            .or(self.file_url.as_deref())
    }
}

/// One step of the breadcrumb trail.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Breadcrumb {
    /// Path segment shown to the user.
    pub name: String,

    /// Cumulative prefix up to and including this segment, delimiter-terminated.
    pub prefix: String,
}

/// A browse request after prefix normalization. Never mutated once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingRequest {
    pub bucket: String,
    pub prefix: String,
}

impl ListingRequest {
    pub fn new(bucket: impl Into<String>, prefix: &str) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: normalize_prefix(prefix),
        }
    }
}

/// Empty stays empty; anything else is made delimiter-terminated.
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with(DELIMITER) {
        prefix.to_string()
    } else {
        format!("{prefix}{DELIMITER}")
    }
}

/// Bytes escaped inside a key's path segments. `/` is left alone so the
/// delimiter keeps separating segments.
const KEY_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode `key` for use as a URL path.
pub fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_SEGMENT).to_string()
}

/// Proxy URL for an object key.
pub fn file_url(key: &str) -> String {
    format!("/file/{}", encode_key(key))
}

/// Thumbnail URL for an object key.
pub fn thumb_url(key: &str) -> String {
    format!("/thumb/{}", encode_key(key))
}

/// Pretty listing URL for a directory prefix.
pub fn browse_url(prefix: &str) -> String {
    format!("/{}", encode_key(prefix))
}
