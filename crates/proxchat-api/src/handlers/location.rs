//! Location endpoints.

use axum::extract::{Query, State};
use axum::Json;

use proxchat_core::error::AppError;
use proxchat_core::result::AppResult;
use proxchat_core::types::response::ApiEnvelope;
use proxchat_service::validation::{validate_coordinates, validate_radius};

use crate::dto::request::{SessionQuery, UpdateLocationRequest};
use crate::dto::response::{LocationUpdated, NearbyResponse};
use crate::extractors::AppJson;
use crate::state::AppState;

/// POST /api/location/update
pub async fn update_location(
    State(state): State<AppState>,
    AppJson(req): AppJson<UpdateLocationRequest>,
) -> AppResult<Json<ApiEnvelope<LocationUpdated>>> {
    validate_coordinates(req.latitude, req.longitude)?;
    validate_radius(
        req.radius,
        state.config.geo.min_radius_m,
        state.config.geo.max_radius_m,
    )?;

    // A location refresh is session activity.
    state
        .sessions
        .touch(&req.session_id)
        .await
        .map_err(|_| AppError::unauthorized("invalid or expired session"))?;

    if !state.limiter.allow_location_update(&req.session_id).await? {
        return Err(AppError::rate_limit("Location update rate limit exceeded"));
    }

    let location = state
        .locations
        .upsert(&req.session_id, req.latitude, req.longitude, req.radius)
        .await?;

    // Keep the live connection's last-known cell current.
    if let Some(client) = state.hub.client(&req.session_id) {
        client.set_cell(&location.cell);
    }

    Ok(Json(ApiEnvelope::ok(LocationUpdated {
        message: "Location updated successfully",
    })))
}

/// GET /api/nearby?session_id=
pub async fn nearby_users(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> AppResult<Json<ApiEnvelope<NearbyResponse>>> {
    if !state.sessions.exists(&query.session_id).await? {
        return Err(AppError::unauthorized("invalid or expired session"));
    }

    let users = state
        .locations
        .nearby(&query.session_id, &state.sessions)
        .await
        .map_err(|e| match e.kind {
            proxchat_core::error::ErrorKind::NotFound => {
                AppError::bad_request("location not set")
            }
            _ => e,
        })?;

    Ok(Json(ApiEnvelope::ok(NearbyResponse {
        count: users.len(),
        users,
    })))
}
