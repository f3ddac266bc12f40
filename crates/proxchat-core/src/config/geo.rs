//! Geohash and visibility-radius configuration.

use serde::{Deserialize, Serialize};

/// Spatial settings.
///
/// The precision is a deployment constant: changing it remaps every cell
/// key, so all nodes sharing a store must agree on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    /// Geohash precision (7 ≈ 150 m cells).
    #[serde(default = "default_precision")]
    pub precision: usize,
    /// Minimum self-selected visibility radius in meters.
    #[serde(default = "default_min_radius")]
    pub min_radius_m: u32,
    /// Maximum self-selected visibility radius in meters.
    #[serde(default = "default_max_radius")]
    pub max_radius_m: u32,
    /// Location record TTL in minutes.
    #[serde(default = "default_location_ttl_minutes")]
    pub location_ttl_minutes: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            min_radius_m: default_min_radius(),
            max_radius_m: default_max_radius(),
            location_ttl_minutes: default_location_ttl_minutes(),
        }
    }
}

fn default_precision() -> usize {
    7
}

fn default_min_radius() -> u32 {
    100
}

fn default_max_radius() -> u32 {
    2000
}

fn default_location_ttl_minutes() -> u64 {
    5
}
