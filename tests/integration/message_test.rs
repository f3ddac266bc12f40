//! Integration tests for the recent-messages endpoint.

use std::time::Duration;

use http::StatusCode;

use proxchat_service::message::ChatMessage;

use crate::helpers::TestApp;

#[tokio::test]
async fn recent_messages_start_empty() {
    let app = TestApp::new().await;
    let session_id = app.create_session("203.0.113.20").await;
    app.set_location(&session_id, 40.7128, -74.0060, 500).await;

    let response = app
        .request(
            "GET",
            &format!("/api/recent-messages?session_id={session_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["messages"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn recent_messages_return_the_callers_cell_newest_first() {
    let app = TestApp::new().await;
    let session_id = app.create_session("203.0.113.21").await;
    app.set_location(&session_id, 40.7128, -74.0060, 500).await;

    let cell = proxchat_geo::encode(40.7128, -74.0060, 7);
    let first = ChatMessage::new("peer", "CalmOwl7", "first", &cell, Duration::from_secs(1800));
    app.state.messages.append(&first).await.unwrap();
    // Scores are whole seconds; space the sends so the order is fixed.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let second = ChatMessage::new("peer", "CalmOwl7", "second", &cell, Duration::from_secs(1800));
    app.state.messages.append(&second).await.unwrap();

    let response = app
        .request(
            "GET",
            &format!("/api/recent-messages?session_id={session_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let messages = response.body["data"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "second");
    assert_eq!(messages[1]["content"], "first");

    // The cell code never leaves the server.
    let raw = serde_json::to_string(&response.body).unwrap();
    assert!(!raw.contains(&cell));
}

#[tokio::test]
async fn recent_messages_require_session_and_location() {
    let app = TestApp::new().await;

    let response = app
        .request("GET", "/api/recent-messages?session_id=unknown", None, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let session_id = app.create_session("203.0.113.22").await;
    let response = app
        .request(
            "GET",
            &format!("/api/recent-messages?session_id={session_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
