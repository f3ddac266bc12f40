//! KV store trait for pluggable ephemeral state backends.
//!
//! The whole server state (sessions, locations, cell memberships,
//! message logs, rate-limit windows, spam digests) lives behind this
//! capability set. Backed by Redis in production and an in-memory
//! provider in tests and single-node development.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::result::AppResult;

/// A message received from a pub/sub subscription.
#[derive(Debug, Clone)]
pub struct PubSubMessage {
    /// The concrete channel the message was published on.
    pub channel: String,
    /// Raw payload.
    pub payload: String,
}

/// Trait for KV backends.
///
/// String values are serialized JSON. TTL enforcement is the provider's
/// responsibility; a key whose TTL elapsed behaves exactly like a missing
/// key. Every operation is individually atomic; no multi-key transactions
/// are offered or required.
#[async_trait]
pub trait KvStore: Send + Sync + std::fmt::Debug + 'static {
    // ── Strings ────────────────────────────────────────────────

    /// Get a value by key. `None` if the key does not exist or expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Set a value only if the key does not already exist (NX).
    /// Returns `true` if the value was set.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool>;

    /// Delete a key.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Increment an integer value by 1. Returns the new value.
    /// A missing key counts from zero and carries no TTL until
    /// [`expire`](Self::expire) is called.
    async fn incr(&self, key: &str) -> AppResult<i64>;

    /// Set the TTL on an existing key. Returns `false` for missing keys.
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool>;

    // ── Sorted sets ────────────────────────────────────────────

    /// Add a member with a score to a sorted set.
    async fn zadd(&self, key: &str, score: f64, member: &str) -> AppResult<()>;

    /// Cardinality of a sorted set.
    async fn zcard(&self, key: &str) -> AppResult<u64>;

    /// Remove members with score in `(-inf, max]`. Returns removed count.
    async fn zrem_range_by_score(&self, key: &str, max: f64) -> AppResult<u64>;

    /// Members by rank, highest score first, inclusive `[start, stop]`.
    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>>;

    // ── Sets ───────────────────────────────────────────────────

    /// Add a member to a set. Returns `true` when newly added.
    async fn sadd(&self, key: &str, member: &str) -> AppResult<bool>;

    /// Remove a member from a set. Returns `true` when it was present.
    async fn srem(&self, key: &str, member: &str) -> AppResult<bool>;

    /// All members of a set.
    async fn smembers(&self, key: &str) -> AppResult<Vec<String>>;

    /// Cardinality of a set.
    async fn scard(&self, key: &str) -> AppResult<u64>;

    // ── Hashes ─────────────────────────────────────────────────

    /// Increment a hash field by `by`. Returns the new value.
    async fn hincr(&self, key: &str, field: &str, by: i64) -> AppResult<i64>;

    /// All fields and values of a hash.
    async fn hgetall(&self, key: &str) -> AppResult<HashMap<String, String>>;

    // ── Keyspace ───────────────────────────────────────────────

    /// All keys matching a glob pattern (e.g. `"messages:*"`). Used by
    /// the background sweepers; not a hot path.
    async fn scan_keys(&self, pattern: &str) -> AppResult<Vec<String>>;

    // ── Pub/sub ────────────────────────────────────────────────

    /// Publish a payload on a channel. Returns the receiver count where
    /// the backend reports one.
    async fn publish(&self, channel: &str, payload: &str) -> AppResult<u64>;

    /// Subscribe to channels matching a glob pattern (e.g. `"chat:*"`).
    /// Messages arrive on the returned receiver until it is dropped.
    async fn subscribe(&self, pattern: &str) -> AppResult<mpsc::Receiver<PubSubMessage>>;

    // ── Lifecycle ──────────────────────────────────────────────

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Remove every key. Test-only convenience.
    async fn flush_all(&self) -> AppResult<()>;

    /// Get a typed value by deserializing from JSON.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> AppResult<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key).await? {
            Some(value) => {
                let parsed = serde_json::from_str(&value)?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value by serializing to JSON.
    async fn set_json<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value)?;
        self.set(key, &json, ttl).await
    }
}
