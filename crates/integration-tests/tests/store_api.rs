//! JSON store endpoints used by page scripts.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use cafe_origen_integration_tests::TestApp;
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn dispatch(app: &TestApp, action: &Value) -> reqwest::Response {
    app.client
        .post(app.url("/api/store/dispatch"))
        .json(action)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_fresh_session_has_initial_state() {
    let app = TestApp::spawn().await;

    let store: Value = app.get("/api/store").await.json().await.unwrap();
    assert_eq!(store["message"], Value::Null);
    assert_eq!(store["todos"][0]["title"], "Make the bed");
    assert_eq!(store["todos"][1]["title"], "Do my homework");
    assert!(store["favorites"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_add_task_colors_one_todo() {
    let app = TestApp::spawn().await;

    let response = dispatch(
        &app,
        &json!({"type": "add_task", "payload": {"id": 2, "color": "#c0ffee"}}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let store: Value = response.json().await.unwrap();
    assert_eq!(store["todos"][0]["background"], Value::Null);
    assert_eq!(store["todos"][1]["background"], "#c0ffee");

    let persisted: Value = app.get("/api/store").await.json().await.unwrap();
    assert_eq!(persisted, store);
}

#[tokio::test]
async fn test_unknown_action_is_rejected() {
    let app = TestApp::spawn().await;
    let before: Value = app.get("/api/store").await.json().await.unwrap();

    let response = dispatch(&app, &json!({"type": "NOPE", "payload": 1})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "Unknown action.");

    let after: Value = app.get("/api/store").await.json().await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_malformed_payload_is_rejected() {
    let app = TestApp::spawn().await;

    let response = dispatch(&app, &json!({"type": "add_task", "payload": "red"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "Invalid action payload.");
}

#[tokio::test]
async fn test_favorite_actions_round_trip_through_session() {
    let app = TestApp::spawn().await;

    dispatch(
        &app,
        &json!({"type": "ADD_TO_FAVORITES",
                "payload": {"uid": 3, "name": "Moka pot", "linkTo": "/products/3"}}),
    )
    .await;
    let store: Value = app.get("/api/store").await.json().await.unwrap();
    assert_eq!(store["favorites"][0]["linkto"], "/products/3");

    dispatch(
        &app,
        &json!({"type": "REMOVE_FROM_FAVORITES", "payload": {"uid": 3}}),
    )
    .await;
    let store: Value = app.get("/api/store").await.json().await.unwrap();
    assert!(store["favorites"].as_array().unwrap().is_empty());
}
