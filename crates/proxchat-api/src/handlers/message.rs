//! Message history endpoint.

use axum::extract::{Query, State};
use axum::Json;

use proxchat_core::error::AppError;
use proxchat_core::result::AppResult;
use proxchat_core::types::response::ApiEnvelope;

use crate::dto::request::SessionQuery;
use crate::dto::response::{MessageEntry, MessagesResponse};
use crate::state::AppState;

/// GET /api/recent-messages?session_id=
///
/// Most recent messages for the caller's current cell, newest first.
pub async fn recent_messages(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> AppResult<Json<ApiEnvelope<MessagesResponse>>> {
    if !state.sessions.exists(&query.session_id).await? {
        return Err(AppError::unauthorized("invalid or expired session"));
    }

    let location = state
        .locations
        .get(&query.session_id)
        .await
        .map_err(|_| AppError::bad_request("location not set"))?;

    let messages = state
        .messages
        .recent(&location.cell, state.config.chat.recent_limit)
        .await?
        .into_iter()
        .map(MessageEntry::from)
        .collect();

    Ok(Json(ApiEnvelope::ok(MessagesResponse { messages })))
}
