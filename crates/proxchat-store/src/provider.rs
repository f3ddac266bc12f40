//! Store manager that dispatches to the configured provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use proxchat_core::config::store::StoreConfig;
use proxchat_core::error::AppError;
use proxchat_core::result::AppResult;
use proxchat_core::traits::store::{KvStore, PubSubMessage};

/// Store manager that wraps the configured KV provider.
///
/// The provider is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    inner: Arc<dyn KvStore>,
}

impl StoreManager {
    /// Create a new store manager from configuration.
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        let inner: Arc<dyn KvStore> = match config.provider.as_str() {
            "redis" => {
                info!("Initializing Redis store provider");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisStoreProvider::new(client))
            }
            "memory" => {
                info!("Initializing in-memory store provider");
                Arc::new(crate::memory::MemoryStoreProvider::new(&config.memory))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a store manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn KvStore>) -> Self {
        Self { inner: provider }
    }

    /// Get a reference to the inner provider.
    pub fn provider(&self) -> &dyn KvStore {
        self.inner.as_ref()
    }
}

#[async_trait]
impl KvStore for StoreManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.set_nx(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        self.inner.incr(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.expire(key, ttl).await
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> AppResult<()> {
        self.inner.zadd(key, score, member).await
    }

    async fn zcard(&self, key: &str) -> AppResult<u64> {
        self.inner.zcard(key).await
    }

    async fn zrem_range_by_score(&self, key: &str, max: f64) -> AppResult<u64> {
        self.inner.zrem_range_by_score(key, max).await
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>> {
        self.inner.zrevrange(key, start, stop).await
    }

    async fn sadd(&self, key: &str, member: &str) -> AppResult<bool> {
        self.inner.sadd(key, member).await
    }

    async fn srem(&self, key: &str, member: &str) -> AppResult<bool> {
        self.inner.srem(key, member).await
    }

    async fn smembers(&self, key: &str) -> AppResult<Vec<String>> {
        self.inner.smembers(key).await
    }

    async fn scard(&self, key: &str) -> AppResult<u64> {
        self.inner.scard(key).await
    }

    async fn hincr(&self, key: &str, field: &str, by: i64) -> AppResult<i64> {
        self.inner.hincr(key, field, by).await
    }

    async fn hgetall(&self, key: &str) -> AppResult<HashMap<String, String>> {
        self.inner.hgetall(key).await
    }

    async fn scan_keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        self.inner.scan_keys(pattern).await
    }

    async fn publish(&self, channel: &str, payload: &str) -> AppResult<u64> {
        self.inner.publish(channel, payload).await
    }

    async fn subscribe(&self, pattern: &str) -> AppResult<mpsc::Receiver<PubSubMessage>> {
        self.inner.subscribe(pattern).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.inner.flush_all().await
    }
}
