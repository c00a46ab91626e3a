//! Route-level checks for the mirror HTTP API.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::ServiceExt;

use boussole::server::{router, AppState};
use boussole::store::SqliteStudentStore;

struct TestApp {
    app: Router,
    student_id: String,
    _dir: tempfile::TempDir,
}

async fn test_app() -> TestApp {
    let dir = tempdir().unwrap();
    let store = SqliteStudentStore::new(dir.path().join("students.db")).await.unwrap();
    store.create_class("Terminale S1", "TS1").await.unwrap();
    let student_id = store.register_student("Omar Benali", "TS1").await.unwrap();
    TestApp {
        app: router(AppState { store: Arc::new(store) }),
        student_id,
        _dir: dir,
    }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_healthy() {
    let t = test_app().await;
    let (status, body) = get(&t.app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn submit_rejects_missing_fields_with_their_names() {
    let t = test_app().await;
    let (status, body) = post_json(
        &t.app,
        "/api/submit",
        json!({ "student_id": t.student_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
    assert_eq!(body["missing"], json!(["domaine", "confidence"]));
}

#[tokio::test]
async fn submit_rejects_out_of_range_confidence() {
    let t = test_app().await;
    for bad in [json!(-1.0), json!(100.5), json!("85")] {
        let (status, body) = post_json(
            &t.app,
            "/api/submit",
            json!({
                "student_id": t.student_id,
                "domaine": "sciences",
                "confidence": bad,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid confidence value");
    }
}

#[tokio::test]
async fn submit_rejects_unknown_student() {
    let t = test_app().await;
    let (status, body) = post_json(
        &t.app,
        "/api/submit",
        json!({
            "student_id": "etu_ghost",
            "domaine": "sciences",
            "confidence": 50.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Student not found");
    assert_eq!(body["student_id"], "etu_ghost");
}

#[tokio::test]
async fn submit_then_listing_shows_the_stored_prediction() {
    let t = test_app().await;
    let (status, body) = post_json(
        &t.app,
        "/api/submit",
        json!({
            "student_id": t.student_id,
            "domaine": "informatique / ingénierie",
            "confidence": 88.0,
            "answers": { "q": "r" },
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["confidence"], 88.0);

    let (status, body) = get(&t.app, "/api/students").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["Nom complet"], "Omar Benali");
    assert_eq!(row["Classe"], "Terminale S1");
    assert_eq!(row["Domaine"], "informatique / ingénierie");
    assert_eq!(row["Confiance"], "88.0%");
    assert_eq!(row["Code"], "TS1");
}

#[tokio::test]
async fn listing_uses_placeholders_before_any_submission() {
    let t = test_app().await;
    let (status, body) = get(&t.app, "/api/students").await;
    assert_eq!(status, StatusCode::OK);
    let row = &body.as_array().unwrap()[0];
    assert_eq!(row["Domaine"], "Aucune réponse");
    assert_eq!(row["Confiance"], "0.0%");
    assert_eq!(row["Date"], "");
}

#[tokio::test]
async fn by_class_normalizes_separators_and_validates_format() {
    let t = test_app().await;

    let (status, body) = get(&t.app, "/api/students/by_class/Terminale_S1").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["Nom complet"], "Omar Benali");
    // Unlike the full listing, per-class rows carry no class code.
    assert!(rows[0].get("Code").is_none());

    let (status, body) = get(&t.app, "/api/students/by_class/bad!name").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid class name format");
}

#[tokio::test]
async fn classes_listing_counts_students() {
    let t = test_app().await;
    let (status, body) = get(&t.app, "/api/classes").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["class_name"], "Terminale S1");
    assert_eq!(rows[0]["class_code"], "TS1");
    assert_eq!(rows[0]["student_count"], 1);
}
