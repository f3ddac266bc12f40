//! Integration tests for session creation and renaming.

use http::StatusCode;

use crate::helpers::{error_code, TestApp};

#[tokio::test]
async fn create_session_returns_a_fresh_identity() {
    let app = TestApp::new().await;

    let response = app.request("POST", "/api/session/create", None, None).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["success"], true);

    let data = &response.body["data"];
    assert!(!data["id"].as_str().unwrap().is_empty());
    assert!(!data["username"].as_str().unwrap().is_empty());
    assert_eq!(data["changes_left"], 3);
    assert_eq!(data["max_changes"], 3);
    assert!(data["created_at"].is_string());
}

#[tokio::test]
async fn username_changes_exhaust_after_three() {
    let app = TestApp::new().await;
    let session_id = app.create_session("203.0.113.1").await;

    // Three renames succeed, counting down.
    for (name, left) in [("Alice", 2), ("Bob", 1), ("Carol", 0)] {
        let response = app
            .request(
                "PATCH",
                "/api/session/username",
                Some(serde_json::json!({
                    "session_id": session_id,
                    "username": name,
                })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["data"]["username"], name);
        assert_eq!(response.body["data"]["changes_left"], left);
    }

    // The fourth is refused by the rate limit.
    let response = app
        .request(
            "PATCH",
            "/api/session/username",
            Some(serde_json::json!({
                "session_id": session_id,
                "username": "Dave",
            })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&response.body), "RATE_LIMIT");
}

#[tokio::test]
async fn invalid_usernames_are_rejected() {
    let app = TestApp::new().await;
    let session_id = app.create_session("203.0.113.2").await;

    for bad in ["ab", "way too long a username", "nope!@#"] {
        let response = app
            .request(
                "PATCH",
                "/api/session/username",
                Some(serde_json::json!({
                    "session_id": session_id,
                    "username": bad,
                })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{bad}");
        assert_eq!(error_code(&response.body), "INVALID_USERNAME");
    }
}

#[tokio::test]
async fn renaming_an_unknown_session_fails() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "PATCH",
            "/api/session/username",
            Some(serde_json::json!({
                "session_id": "00000000-0000-0000-0000-000000000000",
                "username": "Nobody",
            })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.body), "UPDATE_FAILED");
}

#[tokio::test]
async fn malformed_body_gets_the_standard_envelope() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "PATCH",
            "/api/session/username",
            Some(serde_json::json!({"nope": true})),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert_eq!(error_code(&response.body), "INVALID_REQUEST");
}

#[tokio::test]
async fn session_creation_is_capped_per_address() {
    let app = TestApp::new().await;

    for _ in 0..10 {
        let response = app
            .request("POST", "/api/session/create", None, Some("203.0.113.3"))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = app
        .request("POST", "/api/session/create", None, Some("203.0.113.3"))
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&response.body), "RATE_LIMIT");

    // A different address is unaffected.
    let response = app
        .request("POST", "/api/session/create", None, Some("203.0.113.4"))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
}
