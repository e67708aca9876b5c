//! Integration tests for the contribution session endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete, get, open_session, post_empty, put_file, put_json};
use ivd_core::store::memory::Faults;
use ivd_core::submission::SubmissionStatus;
use serde_json::json;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[tokio::test]
async fn catalog_lists_states_and_districts_of_one_state() {
    let app = common::build_test_app(common::seed_districts());

    let json = body_json(get(&app.router, "/api/v1/districts").await).await;
    assert_eq!(json["data"]["states"], json!(["Karnataka", "Kerala"]));
    assert_eq!(json["data"]["districts"], json!([]));

    let json = body_json(get(&app.router, "/api/v1/districts?state=Karnataka").await).await;
    let names: Vec<&str> = json["data"]["districts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["district_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Bengaluru Urban", "Mysuru"]);
}

#[tokio::test]
async fn catalog_is_empty_when_store_is_down() {
    let app = common::build_test_app(common::seed_districts());
    app.store.set_faults(Faults {
        loads: true,
        ..Faults::default()
    });

    let response = get(&app.router, "/api/v1/districts").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["states"], json!([]));
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_session_starts_at_location_step() {
    let app = common::build_test_app(common::seed_districts());
    let id = open_session(&app.router).await;

    let json = body_json(get(&app.router, &format!("/api/v1/contributions/{id}")).await).await;
    let data = &json["data"];
    assert_eq!(data["id"], id.to_string());
    assert_eq!(data["step"], "selecting_location");
    assert_eq!(data["position"], 1);
    assert_eq!(data["total_steps"], 4);
    assert_eq!(data["can_advance"], false);
    assert_eq!(data["can_go_back"], false);
    assert_eq!(data["states"], json!(["Karnataka", "Kerala"]));
}

#[tokio::test]
async fn closed_session_is_gone() {
    let app = common::build_test_app(common::seed_districts());
    let id = open_session(&app.router).await;
    let uri = format!("/api/v1/contributions/{id}");

    assert_eq!(delete(&app.router, &uri).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(delete(&app.router, &uri).await.status(), StatusCode::NOT_FOUND);

    let response = get(&app.router, &uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unknown_session_returns_404() {
    let app = common::build_test_app(common::seed_districts());
    let uri = format!("/api/v1/contributions/{}/advance", uuid::Uuid::new_v4());
    assert_eq!(post_empty(&app.router, &uri).await.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

#[tokio::test]
async fn advance_without_district_does_not_move() {
    let app = common::build_test_app(common::seed_districts());
    let id = open_session(&app.router).await;
    let base = format!("/api/v1/contributions/{id}");

    put_json(&app.router, &format!("{base}/state"), json!({ "state": "Kerala" })).await;
    let response = post_empty(&app.router, &format!("{base}/advance")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["moved"], false);
    assert_eq!(json["data"]["step"], "selecting_location");
    assert_eq!(json["data"]["selected_state"], "Kerala");
}

#[tokio::test]
async fn unknown_state_is_rejected() {
    let app = common::build_test_app(common::seed_districts());
    let id = open_session(&app.router).await;

    let response = put_json(
        &app.router,
        &format!("/api/v1/contributions/{id}/state"),
        json!({ "state": "Atlantis" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn upload_rejects_non_images_and_missing_field() {
    let karnataka = common::seed_districts().remove(0);
    let app = common::build_test_app(vec![karnataka.clone()]);
    let id = open_session(&app.router).await;
    let base = format!("/api/v1/contributions/{id}");

    put_json(&app.router, &format!("{base}/state"), json!({ "state": "Karnataka" })).await;
    put_json(
        &app.router,
        &format!("{base}/district"),
        json!({ "district_id": karnataka.id }),
    )
    .await;
    post_empty(&app.router, &format!("{base}/advance")).await;

    let response =
        put_file(&app.router, &format!("{base}/image"), "image", "notes.txt", b"hello").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = put_file(
        &app.router,
        &format!("{base}/image"),
        "photo",
        "market.png",
        &common::png_bytes(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn image_can_be_changed_before_advancing() {
    let karnataka = common::seed_districts().remove(0);
    let app = common::build_test_app(vec![karnataka.clone()]);
    let id = open_session(&app.router).await;
    let base = format!("/api/v1/contributions/{id}");

    put_json(&app.router, &format!("{base}/state"), json!({ "state": "Karnataka" })).await;
    put_json(
        &app.router,
        &format!("{base}/district"),
        json!({ "district_id": karnataka.id }),
    )
    .await;
    post_empty(&app.router, &format!("{base}/advance")).await;

    let response = put_file(
        &app.router,
        &format!("{base}/image"),
        "image",
        "a.png",
        &common::png_bytes(),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["image"]["file_name"], "a.png");
    assert_eq!(json["data"]["image"]["kind"], "png");
    assert_eq!(json["data"]["can_advance"], true);

    let json = body_json(delete(&app.router, &format!("{base}/image")).await).await;
    assert!(json["data"]["image"].is_null());
    assert_eq!(json["data"]["can_advance"], false);
}

#[tokio::test]
async fn location_reports_are_best_effort() {
    let karnataka = common::seed_districts().remove(0);
    let app = common::build_test_app(vec![karnataka.clone()]);
    let id = open_session(&app.router).await;
    let base = format!("/api/v1/contributions/{id}");

    // Not allowed before the image step.
    let response = put_json(
        &app.router,
        &format!("{base}/location"),
        json!({ "latitude": 12.97, "longitude": 77.59 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    put_json(&app.router, &format!("{base}/state"), json!({ "state": "Karnataka" })).await;
    put_json(
        &app.router,
        &format!("{base}/district"),
        json!({ "district_id": karnataka.id }),
    )
    .await;
    post_empty(&app.router, &format!("{base}/advance")).await;
    put_file(&app.router, &format!("{base}/image"), "image", "a.png", &common::png_bytes()).await;

    let response = put_json(
        &app.router,
        &format!("{base}/location"),
        json!({ "error": "User denied Geolocation" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["captured"], false);
    assert!(json["data"]["coordinates"].is_null());

    let json = body_json(
        put_json(
            &app.router,
            &format!("{base}/location"),
            json!({ "latitude": 12.97, "longitude": 77.59 }),
        )
        .await,
    )
    .await;
    assert_eq!(json["data"]["captured"], true);
    assert_eq!(json["data"]["coordinates"]["latitude"], 12.97);
}

#[tokio::test]
async fn back_keeps_entered_values() {
    let karnataka = common::seed_districts().remove(0);
    let app = common::build_test_app(vec![karnataka.clone()]);
    let id = open_session(&app.router).await;
    common::fill_until_contributor(&app.router, id, &karnataka).await;
    let base = format!("/api/v1/contributions/{id}");

    let json = body_json(post_empty(&app.router, &format!("{base}/back")).await).await;
    assert_eq!(json["data"]["moved"], true);
    assert_eq!(json["data"]["step"], "describing");
    assert_eq!(
        json["data"]["description"],
        "Evening vegetable market near the bus stand"
    );
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_contribution_creates_pending_submission() {
    let karnataka = common::seed_districts().remove(0);
    let app = common::build_test_app(vec![karnataka.clone()]);
    let id = open_session(&app.router).await;
    let base = format!("/api/v1/contributions/{id}");

    common::fill_until_contributor(&app.router, id, &karnataka).await;
    let response = put_json(
        &app.router,
        &format!("{base}/contributor"),
        json!({ "name": "  Asha  ", "contact": "asha@example.org" }),
    )
    .await;
    assert_eq!(body_json(response).await["data"]["can_advance"], true);

    let response = post_empty(&app.router, &format!("{base}/submit")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["step"], "submitted");
    let path = data["receipt"]["storage_path"].as_str().unwrap();
    assert!(path.starts_with("Karnataka/Bengaluru Urban/"), "got {path}");
    assert!(path.ends_with(".png"));

    assert_eq!(app.store.blob_paths(), vec![path.to_string()]);
    assert_eq!(app.store.submission_count(), 1);

    let review = body_json(get(&app.router, "/api/v1/review/submissions").await).await;
    let row = &review["data"]["submissions"][0];
    assert_eq!(row["status"], SubmissionStatus::Pending.as_str());
    assert_eq!(row["contributor_name"], "Asha");
    assert_eq!(row["contributor_contact"], "asha@example.org");
    assert_eq!(row["image_url"], data["receipt"]["image_url"]);
}

#[tokio::test]
async fn file_name_cannot_steer_the_storage_path() {
    let mysuru = common::seed_districts().remove(1);
    let app = common::build_test_app(vec![mysuru.clone()]);
    let id = open_session(&app.router).await;
    let base = format!("/api/v1/contributions/{id}");

    put_json(&app.router, &format!("{base}/state"), json!({ "state": "Karnataka" })).await;
    put_json(&app.router, &format!("{base}/district"), json!({ "district_id": mysuru.id })).await;
    post_empty(&app.router, &format!("{base}/advance")).await;
    let response = put_file(
        &app.router,
        &format!("{base}/image"),
        "image",
        "x./Kerala/Ernakulam/evil",
        &common::png_bytes(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    post_empty(&app.router, &format!("{base}/advance")).await;
    put_json(
        &app.router,
        &format!("{base}/description"),
        json!({ "description": "Palace at dusk" }),
    )
    .await;
    post_empty(&app.router, &format!("{base}/advance")).await;
    put_json(&app.router, &format!("{base}/contributor"), json!({ "name": "Asha" })).await;

    let json = body_json(post_empty(&app.router, &format!("{base}/submit")).await).await;
    let path = json["data"]["receipt"]["storage_path"].as_str().unwrap();

    assert!(path.starts_with("Karnataka/Mysuru/"), "got {path}");
    assert_eq!(path.matches('/').count(), 2, "got {path}");
    assert!(path.ends_with(".png"), "got {path}");
    assert_eq!(app.store.blob_paths(), vec![path.to_string()]);
}

#[tokio::test]
async fn submit_from_wrong_step_is_rejected() {
    let app = common::build_test_app(common::seed_districts());
    let id = open_session(&app.router).await;

    let response = post_empty(&app.router, &format!("/api/v1/contributions/{id}/submit")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.submission_count(), 0);
    assert!(app.store.blob_paths().is_empty());
}

#[tokio::test]
async fn failed_upload_keeps_the_form() {
    let karnataka = common::seed_districts().remove(0);
    let app = common::build_test_app(vec![karnataka.clone()]);
    let id = open_session(&app.router).await;
    let base = format!("/api/v1/contributions/{id}");

    common::fill_until_contributor(&app.router, id, &karnataka).await;
    put_json(&app.router, &format!("{base}/contributor"), json!({ "name": "Asha" })).await;
    app.store.set_faults(Faults {
        uploads: true,
        ..Faults::default()
    });

    let response = post_empty(&app.router, &format!("{base}/submit")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UPSTREAM_ERROR");
    assert_eq!(json["error"], ivd_api::error::SUBMIT_FAILED_MESSAGE);

    let json = body_json(get(&app.router, &base).await).await;
    assert_eq!(json["data"]["step"], "identifying_contributor");
    assert_eq!(json["data"]["contributor_name"], "Asha");
    assert!(json["data"]["last_error"].is_string());
    assert!(app.state.orphans.is_empty());

    // Retry once the backend recovers.
    app.store.set_faults(Faults::default());
    let response = post_empty(&app.router, &format!("{base}/submit")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(app.store.submission_count(), 1);
}

#[tokio::test]
async fn failed_insert_records_an_orphan() {
    let karnataka = common::seed_districts().remove(0);
    let app = common::build_test_app(vec![karnataka.clone()]);
    let id = open_session(&app.router).await;
    let base = format!("/api/v1/contributions/{id}");

    common::fill_until_contributor(&app.router, id, &karnataka).await;
    put_json(&app.router, &format!("{base}/contributor"), json!({ "name": "Asha" })).await;
    app.store.set_faults(Faults {
        inserts: true,
        ..Faults::default()
    });

    let response = post_empty(&app.router, &format!("{base}/submit")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    assert_eq!(app.store.submission_count(), 0);
    let orphans = app.store.orphaned_blob_paths();
    assert_eq!(orphans.len(), 1);

    let json = body_json(get(&app.router, "/api/v1/review/orphans").await).await;
    assert_eq!(json["data"]["orphans"][0]["path"], orphans[0]);
}

#[tokio::test]
async fn reset_starts_over() {
    let karnataka = common::seed_districts().remove(0);
    let app = common::build_test_app(vec![karnataka.clone()]);
    let id = open_session(&app.router).await;
    let base = format!("/api/v1/contributions/{id}");

    common::fill_until_contributor(&app.router, id, &karnataka).await;
    let json = body_json(post_empty(&app.router, &format!("{base}/reset")).await).await;

    assert_eq!(json["data"]["step"], "selecting_location");
    assert!(json["data"]["district"].is_null());
    assert!(json["data"]["image"].is_null());
}
