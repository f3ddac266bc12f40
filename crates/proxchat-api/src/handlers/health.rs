//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use proxchat_core::traits::store::KvStore;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.store.health_check().await {
        Ok(true) => "ok",
        _ => "degraded",
    };

    Json(HealthResponse {
        status,
        time: Utc::now(),
    })
}
