//! Session endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use proxchat_core::error::AppError;
use proxchat_core::result::AppResult;
use proxchat_core::types::response::ApiEnvelope;
use proxchat_service::validation::validate_username;

use crate::dto::request::UpdateUsernameRequest;
use crate::dto::response::{SessionCreated, UsernameUpdated};
use crate::extractors::{AppJson, ClientAddr};
use crate::state::AppState;

/// POST /api/session/create
pub async fn create_session(
    State(state): State<AppState>,
    ClientAddr(addr): ClientAddr,
) -> AppResult<impl IntoResponse> {
    if !state.limiter.allow_session_creation(&addr).await? {
        return Err(AppError::rate_limit("Rate limit exceeded"));
    }

    let session = state.sessions.create(&addr).await?;

    tracing::info!(session_id = %session.id, addr, "session created");
    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::ok(SessionCreated::from(session))),
    ))
}

/// PATCH /api/session/username
pub async fn update_username(
    State(state): State<AppState>,
    AppJson(req): AppJson<UpdateUsernameRequest>,
) -> AppResult<Json<ApiEnvelope<UsernameUpdated>>> {
    validate_username(&req.username)?;

    let (allowed, _remaining) = state.limiter.allow_username_change(&req.session_id).await?;
    if !allowed {
        return Err(AppError::rate_limit("Username change limit reached"));
    }

    let session = state
        .sessions
        .rename(&req.session_id, &req.username)
        .await
        .map_err(|e| AppError::bad_request(e.message).with_code("UPDATE_FAILED"))?;

    // A live stream keeps using the new name from here on.
    if let Some(client) = state.hub.client(&req.session_id) {
        client.set_username(&session.username);
    }

    Ok(Json(ApiEnvelope::ok(UsernameUpdated {
        changes_left: session.remaining_changes(),
        username: session.username,
    })))
}
