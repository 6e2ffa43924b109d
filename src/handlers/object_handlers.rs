//! HTTP handlers for single-object endpoints.
//! File bodies are streamed straight from the store without buffering;
//! thumbnails always answer 200 or 304, never an error status.

use crate::{
    errors::AppError,
    services::{BrowserService, thumbnail::ThumbnailReply},
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};

/// `GET /file/{*key}`: stream the object through the application.
pub async fn get_file(
    State(service): State<BrowserService>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let file = service.serve_file(&key).await?;

    let mut response = Response::new(Body::from_stream(file.body));
    *response.status_mut() = StatusCode::OK;
    set_object_headers(
        response.headers_mut(),
        &file.content_type,
        Some(file.content_length),
    );

    Ok(response)
}

/// `GET /thumb/{*key}`: thumbnail, placeholder, or 304 on a validator match.
pub async fn get_thumbnail(
    State(service): State<BrowserService>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());
    let thumb = service.thumbnail(&key, if_none_match).await;

    let (status, body, content) = match thumb.reply {
        ThumbnailReply::CachedUnchanged => (StatusCode::NOT_MODIFIED, Body::empty(), None),
        ThumbnailReply::Image { bytes, mime } | ThumbnailReply::Placeholder { bytes, mime } => {
            let len = bytes.len() as u64;
            (StatusCode::OK, Body::from(bytes), Some((mime, len)))
        }
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if let Some((mime, len)) = content {
        set_object_headers(headers, mime, Some(len));
    }
    if let Ok(value) = HeaderValue::from_str(&thumb.cache_control) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Ok(value) = HeaderValue::from_str(&thumb.etag) {
        headers.insert(header::ETAG, value);
    }

    response
}

fn set_object_headers(headers: &mut HeaderMap, content_type: &str, length: Option<u64>) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    if let Some(length) = length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
}
