#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use ivd_api::config::{ServerConfig, StoreBackend};
use ivd_api::router::build_app_router;
use ivd_api::state::AppState;
use ivd_core::district::District;
use ivd_core::store::memory::InMemoryStore;
use ivd_core::submission::{Submission, SubmissionStatus};

pub const MULTIPART_BOUNDARY: &str = "ivd-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        session_idle_timeout_secs: 1800,
        reviewer: "admin".to_string(),
        store_backend: StoreBackend::Memory,
        district_seed_file: None::<PathBuf>,
    }
}

/// The router plus handles for inspecting the backend behind it.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub state: AppState,
}

pub fn district(state: &str, name: &str) -> District {
    District {
        id: Uuid::new_v4(),
        state: state.to_string(),
        district_name: name.to_string(),
    }
}

/// Karnataka (two districts) and Kerala (one).
pub fn seed_districts() -> Vec<District> {
    vec![
        district("Karnataka", "Bengaluru Urban"),
        district("Karnataka", "Mysuru"),
        district("Kerala", "Ernakulam"),
    ]
}

/// Build the full application router over an in-memory store.
///
/// Uses the same [`build_app_router`] as `main.rs`, so the middleware stack
/// is exercised too.
pub fn build_test_app(districts: Vec<District>) -> TestApp {
    let store = Arc::new(InMemoryStore::new(districts));
    let state = AppState::new(test_config(), store.clone());
    let router = build_app_router(state.clone(), &test_config());
    TestApp {
        router,
        store,
        state,
    }
}

/// A submission row as the backend would return it.
pub fn submission(
    district: &District,
    status: SubmissionStatus,
    contributor: &str,
    minutes_ago: i64,
) -> Submission {
    let reviewed = status != SubmissionStatus::Pending;
    Submission {
        id: Uuid::new_v4(),
        district_id: district.id,
        image_url: format!("memory://submission-images/{}/img.png", district.state),
        description: format!("Street market in {}", district.district_name),
        contributor_name: contributor.to_string(),
        contributor_contact: None,
        latitude: None,
        longitude: None,
        status,
        submitted_at: Utc::now() - Duration::minutes(minutes_ago),
        reviewed_at: reviewed.then(Utc::now),
        reviewed_by: reviewed.then(|| "admin".to_string()),
        admin_notes: None,
        district: None,
    }
}

/* --------------------------------------------------------------------------
Request helpers
-------------------------------------------------------------------------- */

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_empty(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    json_request(app, Method::POST, uri, body).await
}

pub async fn put_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    json_request(app, Method::PUT, uri, body).await
}

async fn json_request(app: &Router, method: Method, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// PUT a multipart body with a single file field.
pub async fn put_file(
    app: &Router,
    uri: &str,
    field: &str,
    file_name: &str,
    bytes: &[u8],
) -> Response<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Smallest byte string the PNG sniffer accepts.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 32]);
    bytes
}

/* --------------------------------------------------------------------------
Contribution helpers
-------------------------------------------------------------------------- */

pub async fn open_session(app: &Router) -> Uuid {
    let response = post_empty(app, "/api/v1/contributions").await;
    assert_eq!(response.status(), 201);
    let json = body_json(response).await;
    json["data"]["id"].as_str().unwrap().parse().unwrap()
}

/// Drive a fresh session up to the contributor step for `district`.
pub async fn fill_until_contributor(app: &Router, id: Uuid, district: &District) {
    let base = format!("/api/v1/contributions/{id}");

    let r = put_json(
        app,
        &format!("{base}/state"),
        serde_json::json!({ "state": district.state }),
    )
    .await;
    assert_eq!(r.status(), 200);
    let r = put_json(
        app,
        &format!("{base}/district"),
        serde_json::json!({ "district_id": district.id }),
    )
    .await;
    assert_eq!(r.status(), 200);
    assert_moved(app, &format!("{base}/advance")).await;

    let r = put_file(app, &format!("{base}/image"), "image", "market.png", &png_bytes()).await;
    assert_eq!(r.status(), 200);
    assert_moved(app, &format!("{base}/advance")).await;

    let r = put_json(
        app,
        &format!("{base}/description"),
        serde_json::json!({ "description": "Evening vegetable market near the bus stand" }),
    )
    .await;
    assert_eq!(r.status(), 200);
    assert_moved(app, &format!("{base}/advance")).await;
}

async fn assert_moved(app: &Router, uri: &str) {
    let response = post_empty(app, uri).await;
    assert_eq!(response.status(), 200);
    assert_eq!(body_json(response).await["data"]["moved"], true);
}
