//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use proxchat_api::{build_router, AppState};
use proxchat_core::config::AppConfig;
use proxchat_realtime::hub::Hub;
use proxchat_store::StoreManager;

/// Default client address used when a test doesn't care.
pub const TEST_ADDR: &str = "198.51.100.7";

/// Test application context.
pub struct TestApp {
    /// The Axum router for making test requests.
    pub router: Router,
    /// Full application state, for direct service access.
    pub state: AppState,
    /// Process-wide shutdown handle.
    pub shutdown: CancellationToken,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// Create a new test application over the in-memory store.
    pub async fn new() -> Self {
        let config = AppConfig::default();

        let store = Arc::new(
            StoreManager::new(&config.store)
                .await
                .expect("Failed to init store"),
        );

        let shutdown = CancellationToken::new();
        let (hub, hub_loop) = Hub::new(store.clone(), shutdown.clone());
        tokio::spawn(hub_loop.run());

        let state = AppState::new(config, store, hub, shutdown.clone());
        let router = build_router(state.clone());

        Self {
            router,
            state,
            shutdown,
        }
    }

    /// Issue a request against the router. The client address arrives
    /// via `X-Forwarded-For`, like behind the production proxy.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        addr: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .header("X-Forwarded-For", addr.unwrap_or(TEST_ADDR))
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Create a session; returns its id.
    pub async fn create_session(&self, addr: &str) -> String {
        let response = self
            .request("POST", "/api/session/create", None, Some(addr))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["data"]["id"]
            .as_str()
            .expect("session id missing")
            .to_string()
    }

    /// Bind a session to a position.
    pub async fn set_location(&self, session_id: &str, lat: f64, lon: f64, radius: u32) {
        let response = self
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
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    }
}

/// The error code inside the standard envelope.
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("")
}
