//! Location records, cell membership, and the nearby query.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use proxchat_core::config::GeoConfig;
use proxchat_core::error::AppError;
use proxchat_core::result::AppResult;
use proxchat_core::traits::store::KvStore;
use proxchat_geo::{encode, haversine_m, neighbors, round_to_50};
use proxchat_store::{keys, StoreManager};

use crate::session::SessionService;
use crate::validation::{validate_coordinates, validate_radius};

/// The current position claim of a session, stored as JSON under
/// `location:{id}`. The cell code is derived state and never leaves the
/// server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub session_id: String,
    pub lat: f64,
    pub lon: f64,
    pub radius: u32,
    pub cell: String,
    pub updated_at: DateTime<Utc>,
}

/// A peer visible to the caller, with the distance rounded for privacy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyUser {
    pub session_id: String,
    pub username: String,
    pub distance: u32,
}

/// Location index over the KV store. Each session has one record plus a
/// membership entry in its cell's set; both expire together.
#[derive(Debug, Clone)]
pub struct LocationService {
    store: Arc<StoreManager>,
    precision: usize,
    min_radius: u32,
    max_radius: u32,
    ttl: Duration,
}

impl LocationService {
    pub fn new(store: Arc<StoreManager>, config: &GeoConfig) -> Self {
        Self {
            store,
            precision: config.precision,
            min_radius: config.min_radius_m,
            max_radius: config.max_radius_m,
            ttl: Duration::from_secs(config.location_ttl_minutes * 60),
        }
    }

    /// Write a session's position, moving its cell membership when the
    /// cell changed. The previous entry is removed best-effort; `nearby`
    /// additionally skips any stale entries the removal missed.
    pub async fn upsert(
        &self,
        session_id: &str,
        lat: f64,
        lon: f64,
        radius: u32,
    ) -> AppResult<Location> {
        validate_coordinates(lat, lon)?;
        validate_radius(radius, self.min_radius, self.max_radius)?;

        let cell = encode(lat, lon, self.precision);

        if let Ok(previous) = self.get(session_id).await {
            if previous.cell != cell {
                let _ = self.store.srem(&keys::cell(&previous.cell), session_id).await;
            }
        }

        let location = Location {
            session_id: session_id.to_string(),
            lat,
            lon,
            radius,
            cell: cell.clone(),
            updated_at: Utc::now(),
        };

        self.store
            .set_json(&keys::location(session_id), &location, self.ttl)
            .await?;

        let cell_key = keys::cell(&cell);
        self.store.sadd(&cell_key, session_id).await?;
        self.store.expire(&cell_key, self.ttl).await?;

        Ok(location)
    }

    /// Load a session's location. Missing or expired records surface
    /// `NotFound`.
    pub async fn get(&self, session_id: &str) -> AppResult<Location> {
        self.store
            .get_json::<Location>(&keys::location(session_id))
            .await?
            .ok_or_else(|| AppError::not_found("location not found"))
    }

    /// Everyone within the caller's radius: the candidate set is the
    /// union of the caller's cell and its 8 neighbors, filtered by
    /// actual Haversine distance. Inclusive at the radius boundary.
    pub async fn nearby(
        &self,
        session_id: &str,
        sessions: &SessionService,
    ) -> AppResult<Vec<NearbyUser>> {
        let caller = self.get(session_id).await?;

        let mut cells = neighbors(&caller.cell);
        cells.push(caller.cell.clone());

        let mut candidates: HashSet<String> = HashSet::new();
        for cell in &cells {
            let Ok(members) = self.store.smembers(&keys::cell(cell)).await else {
                continue;
            };
            for member in members {
                if member != session_id {
                    candidates.insert(member);
                }
            }
        }

        let mut nearby = Vec::new();
        for candidate in candidates {
            // A membership entry without a location record is stale:
            // skip it silently.
            let Ok(location) = self.get(&candidate).await else {
                continue;
            };

            let distance = haversine_m(caller.lat, caller.lon, location.lat, location.lon);
            if distance <= f64::from(caller.radius) {
                let username = match sessions.get(&candidate).await {
                    Ok(session) => session.username,
                    Err(_) => "Unknown".to_string(),
                };
                nearby.push(NearbyUser {
                    session_id: candidate,
                    username,
                    distance: round_to_50(distance),
                });
            }
        }

        Ok(nearby)
    }

    /// Best-effort removal of the record and its cell membership.
    pub async fn delete(&self, session_id: &str) -> AppResult<()> {
        if let Ok(location) = self.get(session_id).await {
            let _ = self.store.srem(&keys::cell(&location.cell), session_id).await;
        }
        self.store.delete(&keys::location(session_id)).await
    }

    /// Drop empty cell-membership sets. The TTL covers the common case;
    /// this catches sets whose members were removed one by one.
    pub async fn sweep(&self) -> AppResult<u64> {
        let mut removed = 0;
        for key in self.store.scan_keys("cell:*").await? {
            match self.store.scard(&key).await {
                Ok(0) => {
                    self.store.delete(&key).await?;
                    removed += 1;
                }
                Ok(_) => {}
                Err(_) => continue,
            }
        }
        if removed > 0 {
            debug!(removed, "swept empty cell sets");
        }
        Ok(removed)
    }

    /// The configured location TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxchat_core::config::store::MemoryStoreConfig;
    use proxchat_core::config::{RateLimitConfig, SessionConfig};
    use proxchat_store::memory::MemoryStoreProvider;

    fn make_services() -> (Arc<StoreManager>, LocationService, SessionService) {
        let store = Arc::new(StoreManager::from_provider(Arc::new(
            MemoryStoreProvider::new(&MemoryStoreConfig::default()),
        )));
        let locations = LocationService::new(store.clone(), &GeoConfig::default());
        let sessions = SessionService::new(
            store.clone(),
            &SessionConfig::default(),
            &RateLimitConfig::default(),
        );
        (store, locations, sessions)
    }

    #[tokio::test]
    async fn upsert_and_get_roundtrip() {
        let (store, locations, _) = make_services();

        let loc = locations.upsert("s1", 40.7128, -74.0060, 500).await.unwrap();
        assert_eq!(loc.cell, "dr5regw");

        let loaded = locations.get("s1").await.unwrap();
        assert_eq!(loaded.cell, "dr5regw");
        assert_eq!(loaded.radius, 500);

        let members = store.smembers(&keys::cell("dr5regw")).await.unwrap();
        assert_eq!(members, vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn upsert_rejects_bad_input() {
        let (_, locations, _) = make_services();
        assert!(locations.upsert("s1", 91.0, 0.0, 500).await.is_err());
        assert!(locations.upsert("s1", 0.0, 181.0, 500).await.is_err());
        assert!(locations.upsert("s1", 0.0, 0.0, 99).await.is_err());
        assert!(locations.upsert("s1", 0.0, 0.0, 2001).await.is_err());
        // Boundary radii are accepted.
        assert!(locations.upsert("s1", 0.0, 0.0, 100).await.is_ok());
        assert!(locations.upsert("s1", 0.0, 0.0, 2000).await.is_ok());
    }

    #[tokio::test]
    async fn moving_between_cells_updates_membership() {
        let (store, locations, _) = make_services();

        locations.upsert("s1", 40.7128, -74.0060, 500).await.unwrap();
        // Far enough away to land in a different cell.
        let moved = locations.upsert("s1", 40.7308, -73.9975, 500).await.unwrap();
        assert_ne!(moved.cell, "dr5regw");

        let old_members = store.smembers(&keys::cell("dr5regw")).await.unwrap();
        assert!(old_members.is_empty(), "old cell still lists the session");
        let new_members = store.smembers(&keys::cell(&moved.cell)).await.unwrap();
        assert_eq!(new_members, vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn nearby_filters_by_radius_and_skips_self() {
        let (_, locations, sessions) = make_services();

        let a = sessions.create("10.0.0.1").await.unwrap();
        let b = sessions.create("10.0.0.2").await.unwrap();
        let c = sessions.create("10.0.0.3").await.unwrap();

        // A and B are ~160 m apart; C is kilometers away.
        locations.upsert(&a.id, 40.7128, -74.0060, 500).await.unwrap();
        locations.upsert(&b.id, 40.7140, -74.0050, 500).await.unwrap();
        locations.upsert(&c.id, 40.7808, -73.9772, 2000).await.unwrap();

        let visible = locations.nearby(&a.id, &sessions).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].session_id, b.id);
        assert_eq!(visible[0].username, b.username);
        assert_eq!(visible[0].distance, 150);
    }

    #[tokio::test]
    async fn nearby_respects_the_callers_own_radius() {
        let (_, locations, sessions) = make_services();

        let a = sessions.create("10.0.0.1").await.unwrap();
        let b = sessions.create("10.0.0.2").await.unwrap();

        // ~160 m apart, but A only wants to see 100 m.
        locations.upsert(&a.id, 40.7128, -74.0060, 100).await.unwrap();
        locations.upsert(&b.id, 40.7140, -74.0050, 2000).await.unwrap();

        let visible = locations.nearby(&a.id, &sessions).await.unwrap();
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn nearby_skips_stale_membership_entries() {
        let (store, locations, sessions) = make_services();

        let a = sessions.create("10.0.0.1").await.unwrap();
        locations.upsert(&a.id, 40.7128, -74.0060, 500).await.unwrap();

        // A membership entry with no backing location record.
        store.sadd(&keys::cell("dr5regw"), "ghost").await.unwrap();

        let visible = locations.nearby(&a.id, &sessions).await.unwrap();
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_record_and_membership() {
        let (store, locations, _) = make_services();

        locations.upsert("s1", 40.7128, -74.0060, 500).await.unwrap();
        locations.delete("s1").await.unwrap();

        assert!(locations.get("s1").await.is_err());
        assert!(store.smembers(&keys::cell("dr5regw")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sweep_drops_empty_cell_sets() {
        let (store, locations, _) = make_services();

        store.sadd(&keys::cell("aaaaaaa"), "gone").await.unwrap();
        store.srem(&keys::cell("aaaaaaa"), "gone").await.unwrap();
        locations.upsert("s1", 40.7128, -74.0060, 500).await.unwrap();

        let removed = locations.sweep().await.unwrap();
        assert_eq!(removed, 1);
        assert!(!store.exists(&keys::cell("aaaaaaa")).await.unwrap());
        assert!(store.exists(&keys::cell("dr5regw")).await.unwrap());
    }
}
