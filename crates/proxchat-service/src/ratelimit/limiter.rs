//! Rate-limit gate guarding every mutating operation.
//!
//! Sliding windows are sorted sets of timestamps trimmed on every check;
//! longer-horizon limits are plain counters with a TTL set on first
//! increment. Each check is individually atomic at the store; interleaved
//! checks against one subject may admit up to cap + checkers − 1 under
//! contention, which is accepted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use proxchat_core::config::RateLimitConfig;
use proxchat_core::result::AppResult;
use proxchat_core::traits::store::KvStore;
use proxchat_store::{keys, StoreManager};

/// Safety TTL on per-address connection sets, so entries from a crashed
/// node eventually disappear.
const CONNECTION_SET_TTL: Duration = Duration::from_secs(3600);

/// Admission checks by subject (session id or network address).
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<StoreManager>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<StoreManager>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// May this session send a chat message right now?
    pub async fn allow_message(&self, session_id: &str) -> AppResult<bool> {
        self.check_sliding_window(
            &keys::ratelimit_messages(session_id),
            self.config.messages_per_min,
            Duration::from_secs(60),
        )
        .await
    }

    /// May this session update its location right now?
    pub async fn allow_location_update(&self, session_id: &str) -> AppResult<bool> {
        self.check_sliding_window(
            &keys::ratelimit_location(session_id),
            self.config.location_per_min,
            Duration::from_secs(60),
        )
        .await
    }

    /// May this address make another HTTP request right now?
    pub async fn allow_ip_request(&self, addr: &str) -> AppResult<bool> {
        self.check_sliding_window(
            &keys::ip_requests(addr),
            self.config.requests_per_min,
            Duration::from_secs(60),
        )
        .await
    }

    /// May this address create another session this hour?
    pub async fn allow_session_creation(&self, addr: &str) -> AppResult<bool> {
        let key = keys::ip_sessions(addr);
        let count = self.store.incr(&key).await?;
        if count == 1 {
            self.store.expire(&key, Duration::from_secs(3600)).await?;
        }
        Ok(count <= i64::from(self.config.sessions_per_ip_per_hour))
    }

    /// May this session change its username today? Returns the verdict
    /// and the changes remaining in the current window.
    pub async fn allow_username_change(&self, session_id: &str) -> AppResult<(bool, u32)> {
        let key = keys::ratelimit_username(session_id);
        let count = self.store.incr(&key).await?;
        if count == 1 {
            self.store
                .expire(&key, Duration::from_secs(24 * 3600))
                .await?;
        }

        let cap = i64::from(self.config.max_username_changes);
        let remaining = (cap - count + 1).max(0) as u32;
        Ok((count <= cap, remaining))
    }

    /// May this address open another live connection? The member set is
    /// shared across nodes; `conn_id` must be released on disconnect.
    pub async fn allow_connection(&self, addr: &str, conn_id: &str) -> AppResult<bool> {
        let key = keys::ip_connections(addr);
        let open = self.store.scard(&key).await?;
        if open >= u64::from(self.config.connections_per_ip) {
            return Ok(false);
        }
        self.store.sadd(&key, conn_id).await?;
        self.store.expire(&key, CONNECTION_SET_TTL).await?;
        Ok(true)
    }

    /// Release a connection slot taken by [`allow_connection`](Self::allow_connection).
    pub async fn release_connection(&self, addr: &str, conn_id: &str) -> AppResult<()> {
        self.store.srem(&keys::ip_connections(addr), conn_id).await?;
        Ok(())
    }

    /// How many messages the session can still send in this window.
    /// Falls back to the full cap when the store is unreachable: this
    /// path is advisory only.
    pub async fn remaining_messages(&self, session_id: &str) -> u32 {
        match self.store.zcard(&keys::ratelimit_messages(session_id)).await {
            Ok(count) => self.config.messages_per_min.saturating_sub(count as u32),
            Err(_) => self.config.messages_per_min,
        }
    }

    /// Clear every rate-limit key for a session.
    pub async fn reset(&self, session_id: &str) -> AppResult<()> {
        for key in [
            keys::ratelimit_messages(session_id),
            keys::ratelimit_location(session_id),
            keys::ratelimit_username(session_id),
        ] {
            self.store.delete(&key).await?;
        }
        Ok(())
    }

    /// Sliding-window check: drop entries older than the window, count
    /// the rest, deny at the cap, otherwise record this event and
    /// refresh the key TTL.
    async fn check_sliding_window(
        &self,
        key: &str,
        cap: u32,
        window: Duration,
    ) -> AppResult<bool> {
        let now = Utc::now().timestamp_millis() as f64 / 1000.0;
        let window_start = now - window.as_secs_f64();

        self.store.zrem_range_by_score(key, window_start).await?;

        let count = self.store.zcard(key).await?;
        if count >= u64::from(cap) {
            return Ok(false);
        }

        // Member must be unique even for events landing in the same
        // instant.
        let member = format!("{now}:{}", Uuid::new_v4());
        self.store.zadd(key, now, &member).await?;
        self.store.expire(key, window).await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxchat_core::config::store::MemoryStoreConfig;
    use proxchat_store::memory::MemoryStoreProvider;

    fn make_limiter(config: RateLimitConfig) -> RateLimiter {
        let store = Arc::new(StoreManager::from_provider(Arc::new(
            MemoryStoreProvider::new(&MemoryStoreConfig::default()),
        )));
        RateLimiter::new(store, config)
    }

    #[tokio::test]
    async fn message_window_admits_exactly_the_cap() {
        let limiter = make_limiter(RateLimitConfig::default());

        for i in 0..10 {
            assert!(
                limiter.allow_message("s1").await.unwrap(),
                "message {i} should be admitted"
            );
        }
        assert!(!limiter.allow_message("s1").await.unwrap());
        assert_eq!(limiter.remaining_messages("s1").await, 0);

        // Another subject is unaffected.
        assert!(limiter.allow_message("s2").await.unwrap());
    }

    #[tokio::test]
    async fn remaining_messages_counts_down() {
        let limiter = make_limiter(RateLimitConfig::default());
        assert_eq!(limiter.remaining_messages("s1").await, 10);

        limiter.allow_message("s1").await.unwrap();
        limiter.allow_message("s1").await.unwrap();
        assert_eq!(limiter.remaining_messages("s1").await, 8);
    }

    #[tokio::test]
    async fn location_updates_capped_per_minute() {
        let limiter = make_limiter(RateLimitConfig::default());
        for _ in 0..6 {
            assert!(limiter.allow_location_update("s1").await.unwrap());
        }
        assert!(!limiter.allow_location_update("s1").await.unwrap());
    }

    #[tokio::test]
    async fn session_creation_capped_per_address() {
        let limiter = make_limiter(RateLimitConfig::default());
        for _ in 0..10 {
            assert!(limiter.allow_session_creation("10.0.0.1").await.unwrap());
        }
        assert!(!limiter.allow_session_creation("10.0.0.1").await.unwrap());
        assert!(limiter.allow_session_creation("10.0.0.2").await.unwrap());
    }

    #[tokio::test]
    async fn username_changes_report_remaining() {
        let limiter = make_limiter(RateLimitConfig::default());

        let (allowed, remaining) = limiter.allow_username_change("s1").await.unwrap();
        assert!(allowed);
        assert_eq!(remaining, 3);

        limiter.allow_username_change("s1").await.unwrap();
        let (allowed, remaining) = limiter.allow_username_change("s1").await.unwrap();
        assert!(allowed);
        assert_eq!(remaining, 1);

        let (allowed, remaining) = limiter.allow_username_change("s1").await.unwrap();
        assert!(!allowed);
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn connection_slots_per_address() {
        let limiter = make_limiter(RateLimitConfig::default());

        for i in 0..5 {
            assert!(limiter
                .allow_connection("10.0.0.1", &format!("c{i}"))
                .await
                .unwrap());
        }
        assert!(!limiter.allow_connection("10.0.0.1", "c5").await.unwrap());

        limiter.release_connection("10.0.0.1", "c0").await.unwrap();
        assert!(limiter.allow_connection("10.0.0.1", "c5").await.unwrap());
    }

    #[tokio::test]
    async fn reset_clears_session_windows() {
        let limiter = make_limiter(RateLimitConfig::default());
        for _ in 0..10 {
            limiter.allow_message("s1").await.unwrap();
        }
        assert!(!limiter.allow_message("s1").await.unwrap());

        limiter.reset("s1").await.unwrap();
        assert!(limiter.allow_message("s1").await.unwrap());
    }
}
