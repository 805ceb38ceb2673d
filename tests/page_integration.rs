//! HTML page integration tests
//!
//! `/p/{id}` renders escaped content, counts a view and shares the not-found
//! behaviour of the JSON endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mayfly::api;
use mayfly::clock::CLOCK_OVERRIDE_HEADER;
use mayfly::config::*;
use mayfly::storage::{MemoryStorage, Storage};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_app() -> Router {
    let config = Config {
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            url: String::new(),
            max_connections: 1,
            memory_max_entries: 1_000,
            sweep_interval_secs: 0,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        public_base_url: None,
        frontend: FrontendConfig { static_dir: None },
        lifecycle: LifecycleConfig {
            strict_view_limit: true,
            allow_clock_override: true,
        },
        max_body_bytes: Config::DEFAULT_MAX_BODY_BYTES,
    };
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new(1_000));
    api::create_router(storage, &config)
}

async fn create_id(app: &Router, body: Value) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/pastes")
                .header("content-type", "application/json")
                .header(CLOCK_OVERRIDE_HEADER, "0")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    json["id"].as_str().unwrap().to_string()
}

async fn get_page(app: &Router, path: &str, now: i64) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(path)
                .header(CLOCK_OVERRIDE_HEADER, now.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"), "{content_type}");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_page_escapes_script_content() {
    let app = create_test_app();
    let id = create_id(
        &app,
        json!({"content": "<script>alert(\"pwned\") && 'x'</script>"}),
    )
    .await;

    let (status, html) = get_page(&app, &format!("/p/{id}"), 1).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!html.contains("<script>"));
    assert!(!html.contains("</script>"));
    assert!(html.contains(
        "&lt;script&gt;alert(&quot;pwned&quot;) &amp;&amp; &#x27;x&#x27;&lt;&#x2F;script&gt;"
    ));
}

#[tokio::test]
async fn test_page_counts_views_and_shows_limits() {
    let app = create_test_app();
    let id = create_id(
        &app,
        json!({"content": "once", "max_views": 1, "ttl_seconds": 10}),
    )
    .await;

    let (status, html) = get_page(&app, &format!("/p/{id}"), 1).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("This was the last view."));
    assert!(html.contains("1970-01-01T00:00:10.000Z"));

    // The page view consumed the only view; the JSON endpoint now 404s.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/pastes/{id}"))
                .header(CLOCK_OVERRIDE_HEADER, "2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_page_not_found_for_missing_and_expired() {
    let app = create_test_app();
    let id = create_id(&app, json!({"content": "gone soon", "ttl_seconds": 1})).await;

    let (status, expired_html) = get_page(&app, &format!("/p/{id}"), 1_000).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, missing_html) = get_page(&app, "/p/Nope1234", 1_000).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(expired_html, missing_html);
    assert!(missing_html.contains("Paste not found"));
}
