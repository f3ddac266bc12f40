//! Redis-backed KV store implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use proxchat_core::error::AppError;
use proxchat_core::result::AppResult;
use proxchat_core::traits::store::{KvStore, PubSubMessage};

use super::client::RedisClient;

/// Redis-backed store provider.
#[derive(Debug, Clone)]
pub struct RedisStoreProvider {
    client: RedisClient,
}

impl RedisStoreProvider {
    /// Create a new Redis store provider.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::from(e)
    }
}

#[async_trait]
impl KvStore for RedisStoreProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: Option<String> = conn.get(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .set_ex(&full_key, value, ttl.as_secs())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();

        // SET key value EX ttl NX
        let result: Option<String> = redis::cmd("SET")
            .arg(&full_key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs())
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        Ok(result.is_some())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn.del(&full_key).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: bool = conn.exists(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: i64 = conn.incr(&full_key, 1i64).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: bool = conn
            .expire(&full_key, ttl.as_secs() as i64)
            .await
            .map_err(Self::map_err)?;
        Ok(result)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .zadd(&full_key, member, score)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn zcard(&self, key: &str) -> AppResult<u64> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: u64 = conn.zcard(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn zrem_range_by_score(&self, key: &str, max: f64) -> AppResult<u64> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let removed: u64 = redis::cmd("ZREMRANGEBYSCORE")
            .arg(&full_key)
            .arg("-inf")
            .arg(max)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(removed)
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: Vec<String> = conn
            .zrevrange(&full_key, start, stop)
            .await
            .map_err(Self::map_err)?;
        Ok(result)
    }

    async fn sadd(&self, key: &str, member: &str) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let added: i64 = conn.sadd(&full_key, member).await.map_err(Self::map_err)?;
        Ok(added > 0)
    }

    async fn srem(&self, key: &str, member: &str) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let removed: i64 = conn.srem(&full_key, member).await.map_err(Self::map_err)?;
        Ok(removed > 0)
    }

    async fn smembers(&self, key: &str) -> AppResult<Vec<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let members: Vec<String> = conn.smembers(&full_key).await.map_err(Self::map_err)?;
        Ok(members)
    }

    async fn scard(&self, key: &str) -> AppResult<u64> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: u64 = conn.scard(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn hincr(&self, key: &str, field: &str, by: i64) -> AppResult<i64> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: i64 = conn
            .hincr(&full_key, field, by)
            .await
            .map_err(Self::map_err)?;
        Ok(result)
    }

    async fn hgetall(&self, key: &str) -> AppResult<HashMap<String, String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: HashMap<String, String> =
            conn.hgetall(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn scan_keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let full_pattern = self.client.prefixed_key(pattern);
        let mut conn = self.client.conn_mut();

        let mut keys = Vec::new();
        {
            let mut iter: redis::AsyncIter<String> = conn
                .scan_match(&full_pattern)
                .await
                .map_err(Self::map_err)?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        // Hand schema-level keys back to callers.
        let prefix = self.client.prefix();
        if !prefix.is_empty() {
            keys = keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(prefix).map(str::to_string))
                .collect();
        }

        Ok(keys)
    }

    async fn publish(&self, channel: &str, payload: &str) -> AppResult<u64> {
        let mut conn = self.client.conn_mut();
        let receivers: u64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(receivers)
    }

    async fn subscribe(&self, pattern: &str) -> AppResult<mpsc::Receiver<PubSubMessage>> {
        // Pub/sub needs its own connection; the command connection cannot
        // enter subscriber mode.
        let mut pubsub = self
            .client
            .raw()
            .get_async_pubsub()
            .await
            .map_err(Self::map_err)?;
        pubsub.psubscribe(pattern).await.map_err(Self::map_err)?;

        let (tx, rx) = mpsc::channel(64);
        let pattern = pattern.to_string();

        tokio::spawn(async move {
            let mut stream = pubsub.into_on_message();
            while let Some(msg) = stream.next().await {
                let channel = msg.get_channel_name().to_string();
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(error = %e, channel, "dropping undecodable pub/sub payload");
                        continue;
                    }
                };
                if tx.send(PubSubMessage { channel, payload }).await.is_err() {
                    debug!(pattern, "pub/sub receiver dropped, ending subscription");
                    break;
                }
            }
        });

        Ok(rx)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }

    async fn flush_all(&self) -> AppResult<()> {
        // Only remove keys under our prefix, never the entire database.
        let keys = self.scan_keys("*").await?;
        for key in &keys {
            self.delete(key).await?;
        }
        debug!(count = keys.len(), "flushed store keys");
        Ok(())
    }
}
