//! Integration tests for location updates and the nearby query.

use http::StatusCode;

use crate::helpers::{error_code, TestApp};

#[tokio::test]
async fn location_update_succeeds_for_a_live_session() {
    let app = TestApp::new().await;
    let session_id = app.create_session("203.0.113.10").await;

    app.set_location(&session_id, 40.7128, -74.0060, 500).await;
}

#[tokio::test]
async fn out_of_range_input_is_rejected_with_specific_codes() {
    let app = TestApp::new().await;
    let session_id = app.create_session("203.0.113.11").await;

    let cases = [
        (91.0, 0.0, 500, "INVALID_COORDINATES"),
        (-91.0, 0.0, 500, "INVALID_COORDINATES"),
        (0.0, 181.0, 500, "INVALID_COORDINATES"),
        (0.0, 0.0, 99, "INVALID_RADIUS"),
        (0.0, 0.0, 2001, "INVALID_RADIUS"),
    ];
    for (lat, lon, radius, code) in cases {
        let response = app
            .request(
                "POST",
                "/api/location/update",
                Some(serde_json::json!({
                    "session_id": session_id,
                    "latitude": lat,
                    "longitude": lon,
                    "radius": radius,
                })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&response.body), code);
    }

    // Boundary values pass.
    app.set_location(&session_id, 90.0, 180.0, 100).await;
    app.set_location(&session_id, -90.0, -180.0, 2000).await;
}

#[tokio::test]
async fn location_update_requires_a_session() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/location/update",
            Some(serde_json::json!({
                "session_id": "00000000-0000-0000-0000-000000000000",
                "latitude": 40.7128,
                "longitude": -74.0060,
                "radius": 500,
            })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn location_updates_are_rate_limited() {
    let app = TestApp::new().await;
    let session_id = app.create_session("203.0.113.12").await;

    for _ in 0..6 {
        app.set_location(&session_id, 40.7128, -74.0060, 500).await;
    }

    let response = app
        .request(
            "POST",
            "/api/location/update",
            Some(serde_json::json!({
                "session_id": session_id,
                "latitude": 40.7128,
                "longitude": -74.0060,
                "radius": 500,
            })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&response.body), "RATE_LIMIT");
}

#[tokio::test]
async fn two_nearby_sessions_see_each_other_at_150m() {
    let app = TestApp::new().await;

    let a = app.create_session("203.0.113.13").await;
    let b = app.create_session("203.0.113.14").await;
    app.set_location(&a, 40.7128, -74.0060, 500).await;
    app.set_location(&b, 40.7140, -74.0050, 500).await;

    for (caller, other) in [(&a, &b), (&b, &a)] {
        let response = app
            .request("GET", &format!("/api/nearby?session_id={caller}"), None, None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["data"]["count"], 1);

        let user = &response.body["data"]["users"][0];
        assert_eq!(user["session_id"].as_str().unwrap(), other.as_str());
        assert_eq!(user["distance"], 150);
        assert!(user["username"].is_string());
    }
}

#[tokio::test]
async fn nearby_requires_session_and_location() {
    let app = TestApp::new().await;

    let response = app
        .request("GET", "/api/nearby?session_id=unknown", None, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let session_id = app.create_session("203.0.113.15").await;
    let response = app
        .request(
            "GET",
            &format!("/api/nearby?session_id={session_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn far_sessions_are_invisible() {
    let app = TestApp::new().await;

    let a = app.create_session("203.0.113.16").await;
    let b = app.create_session("203.0.113.17").await;
    app.set_location(&a, 40.7128, -74.0060, 2000).await;
    // Midtown, several kilometers away.
    app.set_location(&b, 40.7580, -73.9855, 2000).await;

    let response = app
        .request("GET", &format!("/api/nearby?session_id={a}"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["count"], 0);
}
