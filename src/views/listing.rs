//! Renders a projected directory as an HTML page or a JSON document.

use crate::{
    models::{
        entry::{Breadcrumb, Entry, ListingRequest, browse_url, thumb_url},
        file_kind::{FileKind, is_thumbnailable},
    },
    services::namespace::{Projection, breadcrumbs},
};
use askama::Template;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

/// Everything the listing view shows. An `error` replaces the entries but the
/// page keeps its breadcrumbs so the user can navigate away.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub bucket: String,
    pub prefix: String,
    pub entries: Vec<Entry>,
    pub breadcrumbs: Vec<Breadcrumb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ListingPage {
    pub fn new(request: &ListingRequest, projection: Projection) -> Self {
        Self {
            bucket: request.bucket.clone(),
            prefix: request.prefix.clone(),
            entries: projection.entries,
            breadcrumbs: projection.breadcrumbs,
            error: None,
        }
    }

    pub fn failed(request: &ListingRequest, error: impl ToString) -> Self {
        Self {
            bucket: request.bucket.clone(),
            prefix: request.prefix.clone(),
            entries: Vec::new(),
            breadcrumbs: breadcrumbs(&request.prefix),
            error: Some(error.to_string()),
        }
    }

    /// Render the HTML page; names and links are escaped by the template.
    pub fn render_html(&self) -> askama::Result<String> {
        ListingTemplate::from_page(self).render()
    }
}

#[derive(Template)]
#[template(path = "listing.html")]
struct ListingTemplate<'a> {
    bucket: &'a str,
    prefix: &'a str,
    breadcrumbs: Vec<CrumbLink<'a>>,
    error: Option<&'a str>,
    rows: Vec<Row<'a>>,
    year: i32,
}

struct CrumbLink<'a> {
    name: &'a str,
    href: String,
}

struct Row<'a> {
    name: &'a str,
    href: String,
    is_dir: bool,
    icon: &'static str,
    thumb: Option<String>,
    size: String,
    modified: String,
}

impl<'a> ListingTemplate<'a> {
    fn from_page(page: &'a ListingPage) -> Self {
        Self {
            bucket: &page.bucket,
            prefix: &page.prefix,
            breadcrumbs: page
                .breadcrumbs
                .iter()
                .map(|crumb| CrumbLink {
                    name: &crumb.name,
                    href: browse_url(&crumb.prefix),
                })
                .collect(),
            error: page.error.as_deref(),
            rows: page.entries.iter().map(Row::from_entry).collect(),
            year: Utc::now().year(),
        }
    }
}

impl<'a> Row<'a> {
    fn from_entry(entry: &'a Entry) -> Self {
        if entry.is_dir {
            return Self {
                name: &entry.name,
                href: browse_url(&entry.key),
                is_dir: true,
                icon: "fas fa-folder",
                thumb: None,
                size: "-".into(),
                modified: "-".into(),
            };
        }
        Self {
            name: &entry.name,
            href: entry.preferred_url().unwrap_or_default().to_string(),
            is_dir: false,
            icon: FileKind::from_name(&entry.name).icon_class(),
            thumb: is_thumbnailable(&entry.name).then(|| thumb_url(&entry.key)),
            size: format_size(entry.size),
            modified: format_timestamp(entry.last_modified),
        }
    }
}

/// Human-readable byte count: whole bytes, then two decimals per 1024 step.
pub fn format_size(size: Option<u64>) -> String {
    let Some(size) = size else {
        return "-".into();
    };
    if size < 1024 {
        return format!("{size}B");
    }
    let mut num = size as f64 / 1024.0;
    for unit in ["KB", "MB", "GB", "TB"] {
        if num < 1024.0 {
            return format!("{num:.2}{unit}");
        }
        num /= 1024.0;
    }
    format!("{num:.2}PB")
}

pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".into())
}
