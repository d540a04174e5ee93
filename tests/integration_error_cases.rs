#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
use reqwest::StatusCode;
use serde_json::{Value, json};

mod common;

async fn assert_bad_request(resp: reqwest::Response) -> String {
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    body["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_post_without_session_header_is_rejected() {
    let app = common::TestApp::spawn().await;
    let room = common::new_room();

    let resp = app
        .client
        .post(format!("{}/messages", app.server_url))
        .json(&json!({ "roomId": room, "content": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(assert_bad_request(resp).await, "Session ID required");
    assert_eq!(app.store.count_in_room(&room).await.unwrap(), 0);
}

#[tokio::test]
async fn test_read_without_session_header_is_rejected() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(format!("{}/messages/{}", app.server_url, common::new_room())).send().await.unwrap();

    assert_eq!(assert_bad_request(resp).await, "Session ID required");
}

#[tokio::test]
async fn test_blank_session_header_is_rejected() {
    let app = common::TestApp::spawn().await;

    let resp = app.post_message("   ", &common::new_room(), "hi", None).await;

    assert_eq!(assert_bad_request(resp).await, "Session ID required");
}

#[tokio::test]
async fn test_non_positive_ttl_is_rejected_and_nothing_is_stored() {
    let app = common::TestApp::spawn().await;
    let session = common::new_session();
    let room = common::new_room();

    for ttl in [0, -5] {
        let resp = app.post_message(&session, &room, "hi", Some(ttl)).await;
        let error = assert_bad_request(resp).await;
        assert!(error.contains("expiresInMinutes"), "unexpected error: {error}");
    }

    assert_eq!(app.store.count_in_room(&room).await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_room_id_is_rejected() {
    let app = common::TestApp::spawn().await;

    let resp = app
        .client
        .post(format!("{}/messages", app.server_url))
        .header("X-Session-ID", common::new_session())
        .json(&json!({ "content": "hi" }))
        .send()
        .await
        .unwrap();

    assert!(assert_bad_request(resp).await.contains("roomId"));
}

#[tokio::test]
async fn test_empty_content_is_rejected() {
    let app = common::TestApp::spawn().await;
    let room = common::new_room();

    let resp = app.post_message(&common::new_session(), &room, "", None).await;

    assert!(assert_bad_request(resp).await.contains("content"));
    assert_eq!(app.store.count_in_room(&room).await.unwrap(), 0);
}

#[tokio::test]
async fn test_oversized_content_is_rejected() {
    let mut config = common::get_test_config();
    config.messaging.max_content_bytes = 16;
    let app = common::TestApp::spawn_with_config(config).await;

    let resp = app.post_message(&common::new_session(), &common::new_room(), &"x".repeat(17), None).await;

    assert!(assert_bad_request(resp).await.contains("16 bytes"));
}

#[tokio::test]
async fn test_overlong_room_id_is_rejected() {
    let app = common::TestApp::spawn().await;
    let session = common::new_session();
    let room = "r".repeat(app.config.messaging.max_room_id_len + 1);

    let resp = app.post_message(&session, &room, "hi", None).await;
    assert_bad_request(resp).await;

    let resp = app.read_room(&session, &room).await;
    assert_bad_request(resp).await;
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = common::TestApp::spawn().await;

    let resp = app
        .client
        .post(format!("{}/messages", app.server_url))
        .header("X-Session-ID", common::new_session())
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_bad_request(resp).await;
}

#[tokio::test]
async fn test_wrong_type_ttl_is_rejected() {
    let app = common::TestApp::spawn().await;

    let resp = app
        .client
        .post(format!("{}/messages", app.server_url))
        .header("X-Session-ID", common::new_session())
        .json(&json!({ "roomId": "abc", "content": "hi", "expiresInMinutes": "soon" }))
        .send()
        .await
        .unwrap();

    assert_bad_request(resp).await;
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(format!("{}/nope", app.server_url)).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
