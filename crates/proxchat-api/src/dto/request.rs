//! Request bodies and query parameters.

use serde::Deserialize;

/// Body of `PATCH /api/session/username`.
#[derive(Debug, Deserialize)]
pub struct UpdateUsernameRequest {
    pub session_id: String,
    pub username: String,
}

/// Body of `POST /api/location/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    pub session_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: u32,
}

/// Query parameter carrying the caller's session.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}
