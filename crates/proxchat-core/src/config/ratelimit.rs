//! Rate-limit windows and caps.

use serde::{Deserialize, Serialize};

/// Admission caps for every mutating operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Chat messages per session per minute.
    #[serde(default = "default_messages_per_min")]
    pub messages_per_min: u32,
    /// Location updates per session per minute.
    #[serde(default = "default_location_per_min")]
    pub location_per_min: u32,
    /// HTTP requests per address per minute.
    #[serde(default = "default_requests_per_min")]
    pub requests_per_min: u32,
    /// Session creations per address per hour.
    #[serde(default = "default_sessions_per_ip_per_hour")]
    pub sessions_per_ip_per_hour: u32,
    /// Username changes per session, hard cap mirrored in the session
    /// record.
    #[serde(default = "default_max_username_changes")]
    pub max_username_changes: u32,
    /// Concurrent WebSocket connections per address.
    #[serde(default = "default_connections_per_ip")]
    pub connections_per_ip: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            messages_per_min: default_messages_per_min(),
            location_per_min: default_location_per_min(),
            requests_per_min: default_requests_per_min(),
            sessions_per_ip_per_hour: default_sessions_per_ip_per_hour(),
            max_username_changes: default_max_username_changes(),
            connections_per_ip: default_connections_per_ip(),
        }
    }
}

fn default_messages_per_min() -> u32 {
    10
}

fn default_location_per_min() -> u32 {
    6
}

fn default_requests_per_min() -> u32 {
    100
}

fn default_sessions_per_ip_per_hour() -> u32 {
    10
}

fn default_max_username_changes() -> u32 {
    3
}

fn default_connections_per_ip() -> u32 {
    5
}
