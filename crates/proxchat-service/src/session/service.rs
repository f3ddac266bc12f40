//! Session record lifecycle: create, read, mutate, expire.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use proxchat_core::config::{RateLimitConfig, SessionConfig};
use proxchat_core::error::AppError;
use proxchat_core::result::AppResult;
use proxchat_core::traits::store::KvStore;
use proxchat_store::{keys, StoreManager};

use super::username::generate_username;

/// An anonymous user record, stored as JSON under `session:{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub username_change_count: u32,
    pub max_username_changes: u32,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub ip_address: String,
}

impl Session {
    /// Username changes still available to this session.
    pub fn remaining_changes(&self) -> u32 {
        self.max_username_changes
            .saturating_sub(self.username_change_count)
    }
}

/// Session registry over the KV store. Records expire by TTL on
/// inactivity; ids are v4 UUIDs and never reused.
#[derive(Debug, Clone)]
pub struct SessionService {
    store: Arc<StoreManager>,
    ttl: Duration,
    max_changes: u32,
}

impl SessionService {
    pub fn new(
        store: Arc<StoreManager>,
        config: &SessionConfig,
        ratelimit: &RateLimitConfig,
    ) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(config.ttl_minutes * 60),
            max_changes: ratelimit.max_username_changes,
        }
    }

    /// Create a session bound to a network address, with a random
    /// display name and fresh counters.
    pub async fn create(&self, ip_address: &str) -> AppResult<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            username: generate_username(),
            username_change_count: 0,
            max_username_changes: self.max_changes,
            created_at: now,
            last_seen: now,
            ip_address: ip_address.to_string(),
        };

        self.save(&session).await?;
        Ok(session)
    }

    /// Load a session. Missing or expired records surface `NotFound`.
    pub async fn get(&self, session_id: &str) -> AppResult<Session> {
        self.store
            .get_json::<Session>(&keys::session(session_id))
            .await?
            .ok_or_else(|| AppError::not_found("session not found"))
    }

    /// Change the display name, enforcing the per-session cap. The
    /// record is re-read, checked, and rewritten in one call path; the
    /// counter only ever grows.
    pub async fn rename(&self, session_id: &str, new_username: &str) -> AppResult<Session> {
        let mut session = self.get(session_id).await?;

        if session.username_change_count >= session.max_username_changes {
            return Err(AppError::validation("username change limit reached"));
        }

        session.username = new_username.to_string();
        session.username_change_count += 1;
        session.last_seen = Utc::now();

        self.save(&session).await?;
        Ok(session)
    }

    /// Refresh the activity clock and extend the TTL.
    pub async fn touch(&self, session_id: &str) -> AppResult<()> {
        let mut session = self.get(session_id).await?;
        session.last_seen = Utc::now();
        self.save(&session).await
    }

    pub async fn delete(&self, session_id: &str) -> AppResult<()> {
        self.store.delete(&keys::session(session_id)).await
    }

    pub async fn remaining_changes(&self, session_id: &str) -> AppResult<u32> {
        Ok(self.get(session_id).await?.remaining_changes())
    }

    pub async fn exists(&self, session_id: &str) -> AppResult<bool> {
        self.store.exists(&keys::session(session_id)).await
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        self.store
            .set_json(&keys::session(&session.id), session, self.ttl)
            .await
    }
}
