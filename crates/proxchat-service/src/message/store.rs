//! Time-ordered message logs with TTL, one sorted set per cell.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use proxchat_core::result::AppResult;
use proxchat_core::traits::store::KvStore;
use proxchat_store::{keys, StoreManager};

/// An ephemeral chat message. Never mutated after append; removed by TTL
/// or by the sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub username: String,
    pub content: String,
    pub cell: String,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Mint a message bound to the sender's current cell.
    pub fn new(
        sender_id: &str,
        username: &str,
        content: &str,
        cell: &str,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            username: username.to_string(),
            content: content.to_string(),
            cell: cell.to_string(),
            timestamp: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
        }
    }

    /// Whether the message's own expiry has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Append-and-query log over `messages:{cell}` sorted sets, scored by
/// send timestamp.
#[derive(Debug, Clone)]
pub struct MessageStore {
    store: Arc<StoreManager>,
    ttl: Duration,
}

impl MessageStore {
    pub fn new(store: Arc<StoreManager>, message_ttl_minutes: u64) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(message_ttl_minutes * 60),
        }
    }

    /// Append a message to its cell's log and refresh the key TTL.
    pub async fn append(&self, message: &ChatMessage) -> AppResult<()> {
        let key = keys::messages(&message.cell);
        let serialized = serde_json::to_string(message)?;
        let score = message.timestamp.timestamp() as f64;

        self.store.zadd(&key, score, &serialized).await?;
        self.store.expire(&key, self.ttl).await?;
        Ok(())
    }

    /// The most recent `limit` messages for a cell, newest first.
    /// Entries past their expiry are dropped at read time.
    pub async fn recent(&self, cell: &str, limit: usize) -> AppResult<Vec<ChatMessage>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let key = keys::messages(cell);
        let raw = self
            .store
            .zrevrange(&key, 0, limit as isize - 1)
            .await?;

        let now = Utc::now();
        let messages = raw
            .iter()
            .filter_map(|data| serde_json::from_str::<ChatMessage>(data).ok())
            .filter(|msg| !msg.is_expired(now))
            .collect();

        Ok(messages)
    }

    /// Remove entries older than the TTL from every cell log, deleting
    /// logs that end up empty. Returns the number of removed entries.
    pub async fn sweep(&self) -> AppResult<u64> {
        let cutoff = (Utc::now().timestamp() - self.ttl.as_secs() as i64) as f64;

        let mut removed = 0;
        for key in self.store.scan_keys("messages:*").await? {
            let Ok(n) = self.store.zrem_range_by_score(&key, cutoff).await else {
                continue;
            };
            removed += n;

            if let Ok(0) = self.store.zcard(&key).await {
                self.store.delete(&key).await?;
            }
        }

        if removed > 0 {
            debug!(removed, "swept expired messages");
        }
        Ok(removed)
    }

    /// The configured message TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
