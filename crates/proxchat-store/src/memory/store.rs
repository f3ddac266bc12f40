//! In-memory KV implementation.
//!
//! A typed entry map with per-entry expiry, checked lazily on access.
//! Pub/sub rides on a single process-wide broadcast relay filtered per
//! subscription. Single-node semantics only; multi-node deployments use
//! the Redis provider.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};

use proxchat_core::config::store::MemoryStoreConfig;
use proxchat_core::error::AppError;
use proxchat_core::result::AppResult;
use proxchat_core::traits::store::{KvStore, PubSubMessage};

/// One stored value. The store is schema-less: the first write to a key
/// decides its type, like the backend it stands in for.
#[derive(Debug, Clone)]
enum Value {
    Str(String),
    /// Kept sorted ascending by (score, member).
    ZSet(Vec<(f64, String)>),
    Set(HashSet<String>),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.map(|t| Instant::now() >= t).unwrap_or(false)
    }
}

/// In-memory store provider.
#[derive(Debug)]
pub struct MemoryStoreProvider {
    entries: DashMap<String, Entry>,
    events: broadcast::Sender<PubSubMessage>,
}

impl MemoryStoreProvider {
    /// Create a new in-memory store from configuration.
    pub fn new(config: &MemoryStoreConfig) -> Self {
        let (events, _) = broadcast::channel(config.pubsub_buffer);
        Self {
            entries: DashMap::new(),
            events,
        }
    }

    /// Drop the entry if its TTL elapsed. Called before every access so
    /// an expired key behaves exactly like a missing one.
    fn purge(&self, key: &str) {
        let expired = self
            .entries
            .get(key)
            .map(|e| e.is_expired())
            .unwrap_or(false);
        if expired {
            self.entries.remove(key);
        }
    }

    fn wrong_type(key: &str) -> AppError {
        AppError::store(format!("wrong value type at key '{key}'"))
    }
}

fn pattern_matches(pattern: &str, channel: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => channel.starts_with(prefix),
        None => channel == pattern,
    }
}

#[async_trait]
impl KvStore for MemoryStoreProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.purge(key);
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::Str(s) => Ok(Some(s.clone())),
                _ => Err(Self::wrong_type(key)),
            },
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        self.purge(key);
        if self.entries.contains_key(key) {
            return Ok(false);
        }
        self.set(key, value, ttl).await?;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.purge(key);
        Ok(self.entries.contains_key(key))
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        self.purge(key);
        let mut entry = self.entries.entry(key.to_string()).or_insert(Entry {
            value: Value::Str("0".to_string()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Str(s) => {
                let n: i64 = s
                    .parse()
                    .map_err(|_| AppError::store(format!("non-integer value at key '{key}'")))?;
                let next = n + 1;
                *s = next.to_string();
                Ok(next)
            }
            _ => Err(Self::wrong_type(key)),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.purge(key);
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> AppResult<()> {
        self.purge(key);
        let mut entry = self.entries.entry(key.to_string()).or_insert(Entry {
            value: Value::ZSet(Vec::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::ZSet(members) => {
                members.retain(|(_, m)| m != member);
                members.push((score, member.to_string()));
                members.sort_by(|a, b| {
                    a.0.partial_cmp(&b.0)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.1.cmp(&b.1))
                });
                Ok(())
            }
            _ => Err(Self::wrong_type(key)),
        }
    }

    async fn zcard(&self, key: &str) -> AppResult<u64> {
        self.purge(key);
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::ZSet(members) => Ok(members.len() as u64),
                _ => Err(Self::wrong_type(key)),
            },
            None => Ok(0),
        }
    }

    async fn zrem_range_by_score(&self, key: &str, max: f64) -> AppResult<u64> {
        self.purge(key);
        match self.entries.get_mut(key) {
            Some(mut entry) => match &mut entry.value {
                Value::ZSet(members) => {
                    let before = members.len();
                    members.retain(|(score, _)| *score > max);
                    Ok((before - members.len()) as u64)
                }
                _ => Err(Self::wrong_type(key)),
            },
            None => Ok(0),
        }
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>> {
        self.purge(key);
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::ZSet(members) => {
                    let len = members.len() as isize;
                    let resolve = |idx: isize| if idx < 0 { len + idx } else { idx };
                    let start = resolve(start).max(0);
                    let stop = resolve(stop).min(len - 1);
                    if start > stop || len == 0 {
                        return Ok(Vec::new());
                    }
                    Ok(members
                        .iter()
                        .rev()
                        .skip(start as usize)
                        .take((stop - start + 1) as usize)
                        .map(|(_, m)| m.clone())
                        .collect())
                }
                _ => Err(Self::wrong_type(key)),
            },
            None => Ok(Vec::new()),
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> AppResult<bool> {
        self.purge(key);
        let mut entry = self.entries.entry(key.to_string()).or_insert(Entry {
            value: Value::Set(HashSet::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Set(members) => Ok(members.insert(member.to_string())),
            _ => Err(Self::wrong_type(key)),
        }
    }

    async fn srem(&self, key: &str, member: &str) -> AppResult<bool> {
        self.purge(key);
        match self.entries.get_mut(key) {
            Some(mut entry) => match &mut entry.value {
                Value::Set(members) => Ok(members.remove(member)),
                _ => Err(Self::wrong_type(key)),
            },
            None => Ok(false),
        }
    }

    async fn smembers(&self, key: &str) -> AppResult<Vec<String>> {
        self.purge(key);
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::Set(members) => Ok(members.iter().cloned().collect()),
                _ => Err(Self::wrong_type(key)),
            },
            None => Ok(Vec::new()),
        }
    }

    async fn scard(&self, key: &str) -> AppResult<u64> {
        self.purge(key);
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::Set(members) => Ok(members.len() as u64),
                _ => Err(Self::wrong_type(key)),
            },
            None => Ok(0),
        }
    }

    async fn hincr(&self, key: &str, field: &str, by: i64) -> AppResult<i64> {
        self.purge(key);
        let mut entry = self.entries.entry(key.to_string()).or_insert(Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Hash(fields) => {
                let current: i64 = fields
                    .get(field)
                    .map(|v| v.parse().unwrap_or(0))
                    .unwrap_or(0);
                let next = current + by;
                fields.insert(field.to_string(), next.to_string());
                Ok(next)
            }
            _ => Err(Self::wrong_type(key)),
        }
    }

    async fn hgetall(&self, key: &str) -> AppResult<HashMap<String, String>> {
        self.purge(key);
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::Hash(fields) => Ok(fields.clone()),
                _ => Err(Self::wrong_type(key)),
            },
            None => Ok(HashMap::new()),
        }
    }

    async fn scan_keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.value().is_expired())
            .map(|e| e.key().clone())
            .collect();
        for key in expired {
            self.entries.remove(&key);
        }

        Ok(self
            .entries
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| pattern_matches(pattern, k))
            .collect())
    }

    async fn publish(&self, channel: &str, payload: &str) -> AppResult<u64> {
        let msg = PubSubMessage {
            channel: channel.to_string(),
            payload: payload.to_string(),
        };
        // send() errs when nobody subscribes, which is not an error here.
        Ok(self.events.send(msg).map(|n| n as u64).unwrap_or(0))
    }

    async fn subscribe(&self, pattern: &str) -> AppResult<mpsc::Receiver<PubSubMessage>> {
        let (tx, rx) = mpsc::channel(64);
        let mut events = self.events.subscribe();
        let pattern = pattern.to_string();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(msg) => {
                        if pattern_matches(&pattern, &msg.channel)
                            && tx.send(msg).await.is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.entries.clear();
        Ok(())
    }
}
