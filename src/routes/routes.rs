//! Defines routes for the read-only bucket browser.
//!
//! ## Structure
//! - **Listing endpoints**
//!   - `GET /`: root listing, or `?prefix=` when given
//!   - `GET /{*prefix}`: pretty directory path, same page as `/?prefix=`
//!
//! - **Object endpoints**
//!   - `GET /file/{*key}`: stream an object through the app
//!   - `GET /thumb/{*key}`: cached thumbnail or placeholder
//!
//! Static segments (`file`, `thumb`, `healthz`, `readyz`) win over the
//! catch-all, so top-level directories with those names are not browsable
//! via the pretty path; `/?prefix=` still reaches them.

use crate::{
    handlers::{
        browse_handlers::{browse, index},
        health_handlers::{healthz, readyz},
        object_handlers::{get_file, get_thumbnail},
    },
    services::BrowserService,
};
use axum::{Router, routing::get};

/// Build and return the router for all browser routes.
///
/// The router carries shared state (`BrowserService`) to all handlers.
pub fn routes() -> Router<BrowserService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Object-level routes
        .route("/file/{*key}", get(get_file))
        .route("/thumb/{*key}", get(get_thumbnail))
        // Listing routes
        .route("/", get(index))
        .route("/{*prefix}", get(browse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::test_config,
        services::{
            store_client::{StoreClient, testing::*},
            thumbnail::{fixtures::png, validator},
        },
    };
    use axum::{
        body::{Body, Bytes},
        http::{Request, Response, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use object_store::memory::InMemory;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_with(store: Arc<InMemory>, store_bucket: &str) -> Router {
        let config = Arc::new(test_config(BUCKET));
        let client = StoreClient::new(store_bucket, store, None);
        routes().with_state(BrowserService::new(config, client))
    }

    fn app(store: Arc<InMemory>) -> Router {
        app_with(store, BUCKET)
    }

    async fn send(app: &Router, uri: &str, headers: &[(header::HeaderName, &str)]) -> Response<Body> {
        let mut req = Request::builder().uri(uri);
        for (name, value) in headers {
            req = req.header(name, *value);
        }
        app.clone()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body(resp: Response<Body>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    async fn json(app: &Router, uri: &str) -> Value {
        let resp = send(app, uri, &[(header::ACCEPT, "application/json")]).await;
        assert_eq!(resp.status(), StatusCode::OK);
        serde_json::from_slice(&body(resp).await).unwrap()
    }

    fn header_str<'a>(resp: &'a Response<Body>, name: header::HeaderName) -> &'a str {
        resp.headers().get(name).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn root_lists_directory_before_file() {
        let store = memory_store();
        put(&store, "a.txt", "0123456789").await;
        put(&store, "photos/cat.jpg", "x").await;
        let app = app(store);

        let page = json(&app, "/").await;
        let entries = page["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["name"], "photos");
        assert_eq!(entries[0]["is_dir"], true);
        assert_eq!(entries[0]["key"], "photos/");
        assert!(entries[0].get("size").is_none());
        assert!(entries[0].get("last_modified").is_none());
        assert_eq!(entries[1]["name"], "a.txt");
        assert_eq!(entries[1]["is_dir"], false);
        assert_eq!(entries[1]["size"], 10);
        assert_eq!(entries[1]["file_url"], "/file/a.txt");
        assert!(page.get("error").is_none());
    }

    #[tokio::test]
    async fn pretty_path_and_query_prefix_render_identically() {
        let store = memory_store();
        put(&store, "photos/cat.jpg", "x").await;
        put(&store, "photos/2024/dog.png", "y").await;
        let app = app(store);

        let pretty = json(&app, "/photos/").await;
        let query = json(&app, "/?prefix=photos/").await;
        let bare = json(&app, "/photos").await;
        assert_eq!(pretty, query);
        assert_eq!(pretty, bare);
        assert_eq!(pretty["prefix"], "photos/");
        assert_eq!(pretty["breadcrumbs"][0]["prefix"], "photos/");
        assert_eq!(pretty["entries"][0]["name"], "2024");

        let pretty_html = body(send(&app, "/photos/", &[]).await).await;
        let query_html = body(send(&app, "/?prefix=photos/", &[]).await).await;
        assert_eq!(pretty_html, query_html);
    }

    #[tokio::test]
    async fn listing_failure_renders_inline_with_200() {
        let app = app_with(memory_store(), "some-other-bucket");

        let resp = send(&app, "/docs/", &[]).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(header_str(&resp, header::CONTENT_TYPE).starts_with("text/html"));
        let html = String::from_utf8(body(resp).await.to_vec()).unwrap();
        assert!(html.contains("role=\"alert\""));

        let page = json(&app, "/docs/").await;
        assert!(page["error"].as_str().unwrap().contains("failed to list `docs/`"));
        assert_eq!(page["entries"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn file_proxy_returns_404_or_full_body() {
        let store = memory_store();
        put_typed(&store, "present.png", vec![1u8; 3000], "image/png").await;
        let app = app(store);

        let missing = send(&app, "/file/missing.png", &[]).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let present = send(&app, "/file/present.png", &[]).await;
        assert_eq!(present.status(), StatusCode::OK);
        assert_eq!(header_str(&present, header::CONTENT_TYPE), "image/png");
        assert_eq!(header_str(&present, header::CONTENT_LENGTH), "3000");
        assert_eq!(body(present).await.len(), 3000);
    }

    #[tokio::test]
    async fn listed_links_resolve_back_to_their_keys() {
        let store = memory_store();
        let keys = ["what?.txt", "notes #1.txt", "50%.txt", "odd dir/a&b.txt"];
        for key in keys {
            put(&store, key, key.to_string()).await;
        }
        let app = app(store);

        let mut links = Vec::new();
        for uri in ["/", "/odd%20dir/"] {
            let page = json(&app, uri).await;
            for entry in page["entries"].as_array().unwrap() {
                if let Some(url) = entry["file_url"].as_str() {
                    links.push((entry["key"].as_str().unwrap().to_string(), url.to_string()));
                }
            }
        }
        assert_eq!(links.len(), keys.len());

        for (key, url) in links {
            let resp = send(&app, &url, &[]).await;
            assert_eq!(resp.status(), StatusCode::OK, "{url}");
            assert_eq!(body(resp).await, key.as_bytes());
        }
    }

    #[tokio::test]
    async fn file_proxy_directory_key_is_404() {
        let store = memory_store();
        put(&store, "photos/cat.jpg", "x").await;
        let app = app(store);

        let resp = send(&app, "/file/photos/", &[]).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn file_proxy_upstream_failure_is_500() {
        let app = app_with(memory_store(), "some-other-bucket");
        let resp = send(&app, "/file/a.png", &[]).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn corrupt_and_missing_thumbnails_degrade_to_placeholder() {
        let store = memory_store();
        put(&store, "corrupt.jpg", "these bytes are not a jpeg").await;
        put(&store, "photo.png", png(400, 200)).await;
        let app = app(store);

        let real = send(&app, "/thumb/photo.png", &[]).await;
        assert_eq!(real.status(), StatusCode::OK);
        assert_eq!(header_str(&real, header::CONTENT_TYPE), "image/jpeg");

        for uri in ["/thumb/corrupt.jpg", "/thumb/missing.png"] {
            let degraded = send(&app, uri, &[]).await;
            assert_eq!(degraded.status(), StatusCode::OK, "{uri}");
            assert_eq!(header_str(&degraded, header::CONTENT_TYPE), "image/svg+xml");
            assert_eq!(
                header_str(&degraded, header::CACHE_CONTROL),
                header_str(&real, header::CACHE_CONTROL)
            );
            assert!(header_str(&degraded, header::ETAG).starts_with("W/\""));
            let svg = body(degraded).await;
            assert!(svg.starts_with(b"<svg"));
        }

        assert_eq!(header_str(&real, header::CACHE_CONTROL), "public, max-age=3600");
        let jpeg = body(real).await;
        let thumb = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (320, 160));
    }

    #[tokio::test]
    async fn validator_yields_304_even_after_object_changes() {
        let store = memory_store();
        put(&store, "photo.png", png(50, 50)).await;
        let app = app(store.clone());

        let first = send(&app, "/thumb/photo.png", &[]).await;
        let etag = header_str(&first, header::ETAG).to_string();
        assert_eq!(etag, validator("photo.png"));

        put(&store, "photo.png", png(60, 30)).await;
        for _ in 0..2 {
            let again = send(&app, "/thumb/photo.png", &[(header::IF_NONE_MATCH, etag.as_str())]).await;
            assert_eq!(again.status(), StatusCode::NOT_MODIFIED);
            assert_eq!(header_str(&again, header::ETAG), etag);
            assert_eq!(header_str(&again, header::CACHE_CONTROL), "public, max-age=3600");
            assert!(body(again).await.is_empty());
        }
    }

    #[tokio::test]
    async fn health_probes_reflect_store_access() {
        let healthy = app(memory_store());
        assert_eq!(send(&healthy, "/healthz", &[]).await.status(), StatusCode::OK);
        assert_eq!(send(&healthy, "/readyz", &[]).await.status(), StatusCode::OK);

        let broken = app_with(memory_store(), "some-other-bucket");
        assert_eq!(
            send(&broken, "/readyz", &[]).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
