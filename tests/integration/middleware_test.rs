//! Integration tests for cross-cutting middleware.

use http::StatusCode;

use crate::helpers::{error_code, TestApp};

#[tokio::test]
async fn health_reports_ok_and_skips_the_rate_limit() {
    let app = TestApp::new().await;

    for _ in 0..120 {
        let response = app.request("GET", "/api/health", None, Some("203.0.113.30")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["status"], "ok");
        assert!(response.body["time"].is_string());
    }
}

#[tokio::test]
async fn api_requests_are_capped_per_address() {
    let app = TestApp::new().await;
    let addr = "203.0.113.31";

    // Burn the whole per-minute window; the 101st request is denied
    // before reaching any handler.
    for _ in 0..100 {
        let response = app
            .request("GET", "/api/nearby?session_id=unknown", None, Some(addr))
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    let response = app
        .request("GET", "/api/nearby?session_id=unknown", None, Some(addr))
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&response.body), "RATE_LIMIT");

    // Other addresses keep flowing.
    let response = app
        .request("GET", "/api/nearby?session_id=unknown", None, Some("203.0.113.32"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
