use crate::services::store_client::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required configuration `{0}` is not set")]
    Missing(&'static str),
    #[error("configuration `{name}` has invalid value `{value}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to build store client: {0}")]
    Store(#[source] StoreError),
}

/// Failures a browse or file request can end in.
///
/// Thumbnail failures are not listed here: they never leave the thumbnail
/// engine (see `services::thumbnail::ThumbnailDegraded`).
#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("failed to list `{prefix}`: {source}")]
    ListingFailed {
        prefix: String,
        #[source]
        source: StoreError,
    },
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("failed to fetch `{key}`: {source}")]
    Upstream {
        key: String,
        #[source]
        source: StoreError,
    },
}

impl From<BrowseError> for AppError {
    fn from(err: BrowseError) -> Self {
        match err {
            BrowseError::NotFound(key) => AppError::not_found(format!("object `{key}` not found")),
            other => AppError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browse_errors_map_to_http_status() {
        let not_found: AppError = BrowseError::NotFound("a.png".into()).into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let upstream: AppError = BrowseError::Upstream {
            key: "a.png".into(),
            source: StoreError::PresignUnavailable,
        }
        .into();
        assert_eq!(upstream.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(upstream.message.contains("a.png"));
    }
}
