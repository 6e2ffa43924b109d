//! Directory listing handlers.
//!
//! `/` (optionally with `?prefix=`) and the pretty `/{*prefix}` form share one
//! code path, so both render identical pages for the same prefix.

use crate::{errors::AppError, services::BrowserService, views::listing::ListingPage};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    pub prefix: Option<String>,
}

/// `GET /`: root listing, or `?prefix=` when given.
pub async fn index(
    State(service): State<BrowserService>,
    Query(q): Query<BrowseQuery>,
    headers: HeaderMap,
) -> Response {
    let page = service
        .list_directory(q.prefix.as_deref().unwrap_or_default())
        .await;
    render(page, &headers)
}

/// `GET /{*prefix}`: pretty directory path.
pub async fn browse(
    State(service): State<BrowserService>,
    Path(prefix): Path<String>,
    headers: HeaderMap,
) -> Response {
    let page = service.list_directory(&prefix).await;
    render(page, &headers)
}

/// 200 even for listing errors, which are part of the page.
fn render(page: ListingPage, headers: &HeaderMap) -> Response {
    if wants_json(headers) {
        return Json(page).into_response();
    }
    match page.render_html() {
        Ok(html) => Html(html).into_response(),
        Err(err) => AppError::internal(format!("failed to render listing: {err}")).into_response(),
    }
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}
